//! PostgreSQL-backed stores

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use common::{Alert, AlertStatus, Identity, Role};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::info;
use uuid::Uuid;

use super::{AlertStore, NewUser, UserRecord, UserStore};
use crate::models::{AlertFilter, NewAlert};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, last_login";
const ALERT_COLUMNS: &str = "id, title, description, type, latitude, longitude, accuracy, \
                             user_id, status, created_at, updated_at";

fn column<'r, T>(row: &'r PgRow, name: &str) -> DatabaseResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name).map_err(DatabaseError::Query)
}

fn user_from_row(row: &PgRow) -> DatabaseResult<UserRecord> {
    let role: String = column(row, "role")?;
    Ok(UserRecord {
        identity: Identity {
            id: column(row, "id")?,
            name: column(row, "name")?,
            email: column(row, "email")?,
            role: role.parse()?,
            created_at: column(row, "created_at")?,
            last_login: column(row, "last_login")?,
        },
        password_hash: column(row, "password_hash")?,
    })
}

fn alert_from_row(row: &PgRow) -> DatabaseResult<Alert> {
    let alert_type: String = column(row, "type")?;
    let status: String = column(row, "status")?;
    Ok(Alert {
        id: column(row, "id")?,
        title: column(row, "title")?,
        description: column(row, "description")?,
        alert_type: alert_type.parse()?,
        latitude: column(row, "latitude")?,
        longitude: column(row, "longitude")?,
        accuracy: column(row, "accuracy")?,
        user_id: column(row, "user_id")?,
        status: status.parse()?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

/// User repository
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new_user: NewUser) -> DatabaseResult<Option<Identity>> {
        info!("Creating new user: {}", new_user.email);

        let result = sqlx::query(&format!(
            "INSERT INTO users (id, name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(Some(user_from_row(&row)?.identity)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(DatabaseError::Query(e)),
        }
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<UserRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<UserRecord>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn set_role(&self, id: Uuid, role: Role) -> DatabaseResult<Option<Identity>> {
        info!("Setting role of user {} to {}", id, role);

        let row = sqlx::query(&format!(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(row
            .as_ref()
            .map(user_from_row)
            .transpose()?
            .map(|record| record.identity))
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;
        Ok(())
    }

    async fn list(&self) -> DatabaseResult<Vec<Identity>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        rows.iter()
            .map(|row| user_from_row(row).map(|record| record.identity))
            .collect()
    }
}

/// Alert repository
#[derive(Clone)]
pub struct PgAlertStore {
    pool: PgPool,
}

impl PgAlertStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStore for PgAlertStore {
    async fn insert(&self, new_alert: NewAlert) -> DatabaseResult<Alert> {
        let row = sqlx::query(&format!(
            "INSERT INTO alerts (id, title, description, type, latitude, longitude, accuracy, user_id, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {ALERT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_alert.title)
        .bind(&new_alert.description)
        .bind(new_alert.alert_type.as_str())
        .bind(new_alert.position.latitude)
        .bind(new_alert.position.longitude)
        .bind(new_alert.position.accuracy)
        .bind(new_alert.user_id)
        .bind(AlertStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        alert_from_row(&row)
    }

    async fn find(&self, id: Uuid) -> DatabaseResult<Option<Alert>> {
        let row = sqlx::query(&format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(alert_from_row).transpose()
    }

    async fn list(&self, filter: AlertFilter) -> DatabaseResult<Vec<Alert>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE TRUE"));

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(alert_type) = filter.alert_type {
            query.push(" AND type = ").push_bind(alert_type.as_str());
        }
        if let Some(reporter) = filter.reporter {
            query.push(" AND user_id = ").push_bind(reporter);
        }
        query.push(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        rows.iter().map(alert_from_row).collect()
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: AlertStatus,
        to: AlertStatus,
    ) -> DatabaseResult<Option<Alert>> {
        let row = sqlx::query(&format!(
            "UPDATE alerts SET status = $3, updated_at = now() \
             WHERE id = $1 AND status = $2 RETURNING {ALERT_COLUMNS}"
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(alert_from_row).transpose()
    }
}
