//! Repositories for identities and alerts
//!
//! Handlers talk to the [`UserStore`] and [`AlertStore`] traits. PostgreSQL
//! backs them in production; the in-memory store serves single-node runs
//! and tests.

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use common::{Alert, AlertStatus, Identity, Role};
use uuid::Uuid;

use crate::models::{AlertFilter, NewAlert};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgAlertStore, PgUserStore};

/// Identity plus its password hash; never serialized
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub identity: Identity,
    pub password_hash: String,
}

/// Fields for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; `None` if the email is already registered
    async fn create(&self, new_user: NewUser) -> DatabaseResult<Option<Identity>>;

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<UserRecord>>;

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<UserRecord>>;

    /// Change the stored role; `None` if the user does not exist
    async fn set_role(&self, id: Uuid, role: Role) -> DatabaseResult<Option<Identity>>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()>;

    async fn list(&self) -> DatabaseResult<Vec<Identity>>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Insert a new alert in `pending`
    async fn insert(&self, new_alert: NewAlert) -> DatabaseResult<Alert>;

    async fn find(&self, id: Uuid) -> DatabaseResult<Option<Alert>>;

    /// Alerts matching `filter`, newest first
    async fn list(&self, filter: AlertFilter) -> DatabaseResult<Vec<Alert>>;

    /// Set the status to `to` only if it is still `expected`.
    ///
    /// Returns `None` when the alert is missing or its status moved on.
    async fn update_status(
        &self,
        id: Uuid,
        expected: AlertStatus,
        to: AlertStatus,
    ) -> DatabaseResult<Option<Alert>>;
}

/// Hash a password with Argon2 and a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(password_hash)
}

/// Verify a password against a stored hash
pub fn verify_password(record: &UserRecord, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(&record.password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_the_original() {
        let record = UserRecord {
            identity: Identity {
                id: Uuid::new_v4(),
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                role: Role::User,
                created_at: Utc::now(),
                last_login: None,
            },
            password_hash: hash_password("password123").unwrap(),
        };
        assert!(verify_password(&record, "password123").unwrap());
        assert!(!verify_password(&record, "password124").unwrap());
    }
}
