//! Application state shared across handlers

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use common::cache::RedisPool;
use common::database;

use crate::config::ServerConfig;
use crate::jwt::{JwtConfig, JwtService};
use crate::rate_limiter::{RateLimiter, RateLimiterConfig};
use crate::repositories::{AlertStore, MemoryStore, PgAlertStore, PgUserStore, UserStore};
use crate::revocation::{MemoryDenylist, RedisDenylist, TokenDenylist};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub alerts: Arc<dyn AlertStore>,
    pub jwt_service: JwtService,
    pub denylist: Arc<dyn TokenDenylist>,
    pub rate_limiter: RateLimiter,
    pub admin_pin: Arc<str>,
}

impl AppState {
    /// Wire up backends selected by `config`
    pub async fn from_config(config: &ServerConfig) -> Result<Self> {
        let jwt_service = JwtService::new(config.jwt.clone())?;

        let (users, alerts): (Arc<dyn UserStore>, Arc<dyn AlertStore>) = match &config.database
        {
            Some(db_config) => {
                let pool = database::init_pool(db_config).await?;
                if !database::health_check(&pool).await {
                    anyhow::bail!("Failed to connect to database");
                }
                database::ensure_schema(&pool).await?;
                info!("Database connection successful");
                (
                    Arc::new(PgUserStore::new(pool.clone())),
                    Arc::new(PgAlertStore::new(pool)),
                )
            }
            None => {
                warn!("DATABASE_URL not set, using the in-memory store");
                let store = MemoryStore::new();
                (Arc::new(store.clone()), Arc::new(store))
            }
        };

        let denylist: Arc<dyn TokenDenylist> = match &config.redis {
            Some(redis_config) => {
                let pool = RedisPool::new(redis_config)?;
                if !pool.health_check().await? {
                    anyhow::bail!("Failed to connect to Redis");
                }
                Arc::new(RedisDenylist::new(pool))
            }
            None => {
                warn!("REDIS_URL not set, revoked tokens are tracked in memory");
                Arc::new(MemoryDenylist::new())
            }
        };

        Ok(AppState {
            users,
            alerts,
            jwt_service,
            denylist,
            rate_limiter: RateLimiter::new(config.rate_limiter.clone()),
            admin_pin: Arc::from(config.admin_pin.as_str()),
        })
    }

    /// Fully in-memory state
    pub fn in_memory(jwt: JwtConfig, admin_pin: &str) -> Result<Self> {
        let store = MemoryStore::new();
        Ok(AppState {
            users: Arc::new(store.clone()),
            alerts: Arc::new(store),
            jwt_service: JwtService::new(jwt)?,
            denylist: Arc::new(MemoryDenylist::new()),
            rate_limiter: RateLimiter::new(RateLimiterConfig::default()),
            admin_pin: Arc::from(admin_pin),
        })
    }
}
