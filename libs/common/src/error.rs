//! Custom error types for the common library
//!
//! This module defines the errors raised by the domain types and the alert
//! lifecycle, plus the database errors used by the server.

use thiserror::Error;

use crate::models::AlertStatus;

/// Errors raised when parsing or transitioning domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The actor may not request this target status
    #[error("Transition to '{to}' is not permitted for this actor")]
    NotPermitted { from: AlertStatus, to: AlertStatus },

    /// The table has no edge from the current status to the target
    #[error("Cannot transition alert from '{from}' to '{to}'")]
    IllegalTransition { from: AlertStatus, to: AlertStatus },

    /// A status name outside the five known statuses
    #[error(
        "Invalid status '{0}'. Must be one of: pending, investigating, resolved, rejected, solved"
    )]
    UnknownStatus(String),

    /// A role name other than user or admin
    #[error("Invalid role '{0}'. Must be one of: user, admin")]
    UnknownRole(String),

    /// An alert category outside the known set
    #[error(
        "Invalid alert type '{0}'. Must be one of: deforestation, fire, pollution, wildlife, other"
    )]
    UnknownAlertType(String),
}

/// Custom error type for database operations
#[cfg(feature = "db")]
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] sqlx::Error),

    /// Error occurred while applying the schema
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// A stored value could not be mapped onto a domain type
    #[error("Corrupt row: {0}")]
    CorruptRow(#[from] LifecycleError),
}

/// Type alias for Result with DatabaseError
#[cfg(feature = "db")]
pub type DatabaseResult<T> = Result<T, DatabaseError>;
