//! Server configuration

use anyhow::Result;
use std::env;
use std::net::SocketAddr;

use common::cache::RedisConfig;
use common::database::DatabaseConfig;

use crate::jwt::JwtConfig;
use crate::rate_limiter::RateLimiterConfig;

/// Everything the server reads at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Shared secret for the user -> admin upgrade
    pub admin_pin: String,
    pub jwt: JwtConfig,
    /// `None` selects the in-memory store
    pub database: Option<DatabaseConfig>,
    /// `None` selects the in-memory revocation list
    pub redis: Option<RedisConfig>,
    pub rate_limiter: RateLimiterConfig,
}

impl ServerConfig {
    /// Create a new ServerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `BIND_ADDR`: listen address (default: "0.0.0.0:5000")
    /// - `ADMIN_PIN`: PIN for the admin upgrade (required)
    /// - `LOGIN_MAX_FAILURES`: failures before a ban (default: 5)
    /// - plus those read by [`JwtConfig`], [`DatabaseConfig`] and [`RedisConfig`]
    pub fn from_env() -> Result<Self> {
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:5000".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid BIND_ADDR: {}", e))?;

        let admin_pin = env::var("ADMIN_PIN")
            .map_err(|_| anyhow::anyhow!("ADMIN_PIN environment variable not set"))?
            .trim()
            .to_string();
        if admin_pin.is_empty() {
            anyhow::bail!("ADMIN_PIN must not be empty");
        }

        let mut rate_limiter = RateLimiterConfig::default();
        if let Some(max) = env::var("LOGIN_MAX_FAILURES")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            rate_limiter.max_attempts = max;
        }

        Ok(ServerConfig {
            bind_addr,
            admin_pin,
            jwt: JwtConfig::from_env()?,
            database: DatabaseConfig::from_env(),
            redis: RedisConfig::from_env(),
            rate_limiter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        unsafe {
            for key in [
                "BIND_ADDR",
                "ADMIN_PIN",
                "JWT_SECRET",
                "JWT_PRIVATE_KEY",
                "JWT_PUBLIC_KEY",
                "DATABASE_URL",
                "REDIS_URL",
                "LOGIN_MAX_FAILURES",
            ] {
                env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn defaults_to_memory_backends() {
        clear();
        unsafe {
            env::set_var("ADMIN_PIN", " TREE2025 ");
            env::set_var("JWT_SECRET", "a-secret-of-sufficient-length");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.admin_pin, "TREE2025");
        assert!(config.database.is_none());
        assert!(config.redis.is_none());
        assert_eq!(config.jwt.access_token_expiry, 604800);
        assert_eq!(config.rate_limiter.max_attempts, 5);

        clear();
    }

    #[test]
    #[serial]
    fn admin_pin_is_required() {
        clear();
        unsafe {
            env::set_var("JWT_SECRET", "a-secret-of-sufficient-length");
        }
        assert!(ServerConfig::from_env().is_err());
        clear();
    }

    #[test]
    #[serial]
    fn short_jwt_secret_is_refused() {
        clear();
        unsafe {
            env::set_var("ADMIN_PIN", "TREE2025");
            env::set_var("JWT_SECRET", "short");
        }
        assert!(ServerConfig::from_env().is_err());
        clear();
    }
}
