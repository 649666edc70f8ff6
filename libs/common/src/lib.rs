//! Common library for the Tree Lives application
//!
//! This crate holds the domain shared by the API server and the client:
//! identities and roles, environmental alerts, and the alert lifecycle
//! (status state machine). With the `db` feature it also provides the
//! PostgreSQL and Redis connection helpers used by the server.

#[cfg(feature = "db")]
pub mod cache;
#[cfg(feature = "db")]
pub mod database;
pub mod error;
pub mod lifecycle;
pub mod models;

pub use lifecycle::{Actor, check_transition};
pub use models::{Alert, AlertStatus, AlertType, Identity, Position, Role};
