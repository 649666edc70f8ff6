//! Revoked credential ids
//!
//! A token is revoked by its `jti` for the rest of its lifetime. Revocation
//! happens on logout and when a PIN upgrade replaces the caller's token.

use anyhow::Result;
use async_trait::async_trait;
use common::cache::RedisPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

#[async_trait]
pub trait TokenDenylist: Send + Sync {
    /// Revoke `jti` for `ttl_seconds`
    async fn revoke(&self, jti: Uuid, ttl_seconds: u64) -> Result<()>;

    async fn is_revoked(&self, jti: Uuid) -> Result<bool>;
}

fn key(jti: Uuid) -> String {
    format!("revoked_token:{}", jti)
}

/// Redis-backed denylist; entries expire with the token
pub struct RedisDenylist {
    pool: RedisPool,
}

impl RedisDenylist {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenDenylist for RedisDenylist {
    async fn revoke(&self, jti: Uuid, ttl_seconds: u64) -> Result<()> {
        self.pool.set_expiring(&key(jti), "1", ttl_seconds).await
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool> {
        self.pool.exists(&key(jti)).await
    }
}

/// Process-local denylist for single-node deployments and tests
#[derive(Default, Clone)]
pub struct MemoryDenylist {
    entries: Arc<Mutex<HashMap<Uuid, Instant>>>,
}

impl MemoryDenylist {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenDenylist for MemoryDenylist {
    async fn revoke(&self, jti: Uuid, ttl_seconds: u64) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, expires| *expires > now);
        entries.insert(jti, now + Duration::from_secs(ttl_seconds.max(1)));
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool> {
        let entries = self.entries.lock().await;
        Ok(entries
            .get(&jti)
            .is_some_and(|expires| *expires > Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revoked_id_is_reported_until_expiry() {
        let denylist = MemoryDenylist::new();
        let jti = Uuid::new_v4();

        assert!(!denylist.is_revoked(jti).await.unwrap());
        denylist.revoke(jti, 60).await.unwrap();
        assert!(denylist.is_revoked(jti).await.unwrap());
        assert!(!denylist.is_revoked(Uuid::new_v4()).await.unwrap());
    }
}
