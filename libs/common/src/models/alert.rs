//! Alert model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::LifecycleError;

/// Category of an environmental incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Deforestation,
    Fire,
    Pollution,
    Wildlife,
    Other,
}

impl AlertType {
    pub const ALL: [AlertType; 5] = [
        AlertType::Deforestation,
        AlertType::Fire,
        AlertType::Pollution,
        AlertType::Wildlife,
        AlertType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Deforestation => "deforestation",
            AlertType::Fire => "fire",
            AlertType::Pollution => "pollution",
            AlertType::Wildlife => "wildlife",
            AlertType::Other => "other",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| LifecycleError::UnknownAlertType(s.to_string()))
    }
}

/// Status of an alert.
///
/// `Pending` is initial. `Investigating` is open and may still move to
/// `Resolved`, `Rejected` or `Solved`. `Resolved`, `Rejected` and `Solved`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Investigating,
    Resolved,
    Rejected,
    Solved,
}

impl AlertStatus {
    pub const ALL: [AlertStatus; 5] = [
        AlertStatus::Pending,
        AlertStatus::Investigating,
        AlertStatus::Resolved,
        AlertStatus::Rejected,
        AlertStatus::Solved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Investigating => "investigating",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Rejected => "rejected",
            AlertStatus::Solved => "solved",
        }
    }

    /// No transition is defined out of a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AlertStatus::Resolved | AlertStatus::Rejected | AlertStatus::Solved
        )
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| LifecycleError::UnknownStatus(s.to_string()))
    }
}

/// Resolved device position attached to a new alert
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters
    #[serde(default)]
    pub accuracy: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
        }
    }

    /// Latitude/longitude are finite and inside WGS84 bounds
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.accuracy.is_finite()
            && self.accuracy >= 0.0
    }
}

/// Alert entity
///
/// `latitude`, `longitude` and `user_id` (the reporter) are fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: f64,
    pub user_id: Uuid,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude, self.accuracy)
    }

    pub fn is_reported_by(&self, identity_id: Uuid) -> bool {
        self.user_id == identity_id
    }
}
