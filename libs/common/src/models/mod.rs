//! Domain models shared by the server and the client

pub mod alert;
pub mod identity;

// Re-export for convenience
pub use alert::{Alert, AlertStatus, AlertType, Position};
pub use identity::{Identity, Role};
