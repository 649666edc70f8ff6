//! API models for request and response payloads

use common::{Alert, AlertStatus, AlertType, Identity, Position};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request for user registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Requested role; anything but `user` is ignored
    #[serde(default)]
    pub role: Option<String>,
}

/// Request for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request for the PIN role upgrade
#[derive(Debug, Deserialize)]
pub struct UpgradeRequest {
    #[serde(default)]
    pub pin: Option<String>,
}

/// Response carrying a freshly issued credential
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub access_token: String,
    pub user: Identity,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: Identity,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<Identity>,
}

/// Request for alert creation
#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

/// Request for an administrator status change
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: Option<String>,
}

/// Query parameters for the public alert listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub message: String,
    pub alert: Alert,
}

#[derive(Debug, Serialize)]
pub struct AlertListResponse {
    pub alerts: Vec<Alert>,
}

/// Validated alert ready to be stored
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub title: String,
    pub description: String,
    pub alert_type: AlertType,
    pub position: Position,
    pub user_id: Uuid,
}

/// Parsed listing filters
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    pub alert_type: Option<AlertType>,
    pub reporter: Option<Uuid>,
    pub limit: Option<usize>,
}

impl AlertFilter {
    pub fn by_reporter(user_id: Uuid) -> Self {
        Self {
            reporter: Some(user_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        self.status.is_none_or(|s| s == alert.status)
            && self.alert_type.is_none_or(|t| t == alert.alert_type)
            && self.reporter.is_none_or(|r| r == alert.user_id)
    }
}
