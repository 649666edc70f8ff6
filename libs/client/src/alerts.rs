//! Alert Repository: alert operations scoped by the session's credential.
//!
//! Permission and legality of status changes are decided by the server;
//! a refusal here is authoritative and is not retried.

use common::{Alert, AlertStatus, AlertType, Position};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::http::{ApiClient, Endpoint};
use crate::session::SessionStore;

/// A report ready to submit; the caller attaches the device position
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub title: String,
    pub description: String,
    pub alert_type: AlertType,
    pub position: Option<Position>,
}

impl AlertDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>, alert_type: AlertType) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            alert_type,
            position: None,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Reject input that cannot be submitted
    pub fn validate(&self) -> ClientResult<Position> {
        if self.title.trim().is_empty() {
            return Err(ClientError::Validation("Title is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(ClientError::Validation("Description is required".to_string()));
        }
        let position = self
            .position
            .ok_or_else(|| ClientError::Validation("Location is required".to_string()))?;
        if !position.is_valid() {
            return Err(ClientError::Validation("Invalid location".to_string()));
        }
        Ok(position)
    }
}

#[derive(Serialize)]
struct CreateBody<'a> {
    title: &'a str,
    description: &'a str,
    #[serde(rename = "type")]
    alert_type: AlertType,
    latitude: f64,
    longitude: f64,
    accuracy: f64,
}

#[derive(Deserialize)]
struct AlertPayload {
    alert: Alert,
}

#[derive(Deserialize)]
struct AlertsPayload {
    alerts: Vec<Alert>,
}

#[derive(Clone)]
pub struct AlertRepository {
    api: ApiClient,
    session: SessionStore,
}

impl AlertRepository {
    pub fn new(api: ApiClient, session: SessionStore) -> Self {
        Self { api, session }
    }

    fn credential(&self) -> ClientResult<String> {
        self.session
            .credential()
            .ok_or_else(ClientError::not_signed_in)
    }

    /// Submit `draft` as the signed-in identity
    pub async fn create(&self, draft: &AlertDraft) -> ClientResult<Alert> {
        let position = draft.validate()?;
        let credential = self.credential()?;

        let request = self
            .api
            .request(Method::POST, "/api/alerts", Some(&credential))
            .json(&CreateBody {
                title: draft.title.trim(),
                description: draft.description.trim(),
                alert_type: draft.alert_type,
                latitude: position.latitude,
                longitude: position.longitude,
                accuracy: position.accuracy,
            });
        let payload: AlertPayload = self.api.send(request, Endpoint::General).await?;

        info!(alert_id = %payload.alert.id, "Alert submitted");
        Ok(payload.alert)
    }

    /// Every alert, optionally with exactly `status`. No credential needed.
    pub async fn list_public(&self, status: Option<AlertStatus>) -> ClientResult<Vec<Alert>> {
        let mut request = self.api.request(Method::GET, "/api/alerts", None);
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }
        let payload: AlertsPayload = self.api.send(request, Endpoint::General).await?;
        Ok(payload.alerts)
    }

    /// Alerts reported by the signed-in identity
    pub async fn list_own(&self) -> ClientResult<Vec<Alert>> {
        let credential = self.credential()?;
        let request = self
            .api
            .request(Method::GET, "/api/alerts/user", Some(&credential));
        let payload: AlertsPayload = self.api.send(request, Endpoint::General).await?;
        Ok(payload.alerts)
    }

    /// Every alert; admin only
    pub async fn list_all(&self) -> ClientResult<Vec<Alert>> {
        let credential = self.credential()?;
        let request = self
            .api
            .request(Method::GET, "/api/admin/alerts", Some(&credential));
        let payload: AlertsPayload = self.api.send(request, Endpoint::General).await?;
        Ok(payload.alerts)
    }

    pub async fn get(&self, id: Uuid) -> ClientResult<Alert> {
        let request = self
            .api
            .request(Method::GET, &format!("/api/alerts/{}", id), None);
        let payload: AlertPayload = self.api.send(request, Endpoint::General).await?;
        Ok(payload.alert)
    }

    /// Ask the server to move alert `id` to `status`.
    ///
    /// `solved` is the reporter's dismissal; every other status goes through
    /// the general update route.
    pub async fn transition(&self, id: Uuid, status: AlertStatus) -> ClientResult<Alert> {
        let credential = self.credential()?;

        let request = match status {
            AlertStatus::Solved => self.api.request(
                Method::PUT,
                &format!("/api/alerts/{}/dismiss", id),
                Some(&credential),
            ),
            _ => self
                .api
                .request(Method::PUT, &format!("/api/alerts/{}", id), Some(&credential))
                .json(&json!({ "status": status })),
        };
        let payload: AlertPayload = self.api.send(request, Endpoint::Transition).await?;

        info!(alert_id = %id, status = %payload.alert.status, "Alert status changed");
        Ok(payload.alert)
    }
}
