//! In-memory store for single-node runs and tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use common::{Alert, AlertStatus, Identity, Role};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AlertStore, NewUser, UserRecord, UserStore};
use crate::models::{AlertFilter, NewAlert};

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    /// Insertion order
    alerts: Vec<Alert>,
}

/// Both stores over one lock; clones share state
#[derive(Default, Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, new_user: NewUser) -> DatabaseResult<Option<Identity>> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.identity.email == new_user.email) {
            return Ok(None);
        }

        let identity = Identity {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            role: new_user.role,
            created_at: Utc::now(),
            last_login: None,
        };
        tables.users.push(UserRecord {
            identity: identity.clone(),
            password_hash: new_user.password_hash,
        });
        Ok(Some(identity))
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.identity.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.identity.id == id).cloned())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> DatabaseResult<Option<Identity>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .users
            .iter_mut()
            .find(|u| u.identity.id == id)
            .map(|u| {
                u.identity.role = role;
                u.identity.clone()
            }))
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.identity.id == id) {
            user.identity.last_login = Some(at);
        }
        Ok(())
    }

    async fn list(&self) -> DatabaseResult<Vec<Identity>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .rev()
            .map(|u| u.identity.clone())
            .collect())
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn insert(&self, new_alert: NewAlert) -> DatabaseResult<Alert> {
        let now = Utc::now();
        let alert = Alert {
            id: Uuid::new_v4(),
            title: new_alert.title,
            description: new_alert.description,
            alert_type: new_alert.alert_type,
            latitude: new_alert.position.latitude,
            longitude: new_alert.position.longitude,
            accuracy: new_alert.position.accuracy,
            user_id: new_alert.user_id,
            status: AlertStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.alerts.push(alert.clone());
        Ok(alert)
    }

    async fn find(&self, id: Uuid) -> DatabaseResult<Option<Alert>> {
        let tables = self.tables.read().await;
        Ok(tables.alerts.iter().find(|a| a.id == id).cloned())
    }

    async fn list(&self, filter: AlertFilter) -> DatabaseResult<Vec<Alert>> {
        let tables = self.tables.read().await;
        let matching = tables
            .alerts
            .iter()
            .rev()
            .filter(|a| filter.matches(a))
            .cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: AlertStatus,
        to: AlertStatus,
    ) -> DatabaseResult<Option<Alert>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .alerts
            .iter_mut()
            .find(|a| a.id == id && a.status == expected)
            .map(|a| {
                a.status = to;
                a.updated_at = Utc::now();
                a.clone()
            }))
    }
}
