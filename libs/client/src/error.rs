//! Client error taxonomy

use thiserror::Error;

/// Outcome of a failed identity, alert or session operation.
///
/// Messages carry the server's `error` text when there was one, so they can
/// be shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Malformed or incomplete input, or a payload the server refused
    #[error("{0}")]
    Validation(String),

    /// Bad credentials, a rejected or revoked token, an invalid PIN
    #[error("{0}")]
    Auth(String),

    /// Status change not permitted for this actor or from this status
    #[error("{0}")]
    InvalidTransition(String),

    /// The request did not complete
    #[error("Network error: {0}")]
    Network(String),

    /// Durable session storage could not be read or written
    #[error("Session storage error: {0}")]
    Storage(String),
}

impl ClientError {
    pub(crate) fn not_signed_in() -> Self {
        ClientError::Auth("Not signed in".to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
