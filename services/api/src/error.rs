//! Custom error types for the API service

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::{DatabaseError, LifecycleError};
use serde_json::json;
use thiserror::Error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, invalid, expired or revoked credential; bad login
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("{0}")]
    Forbidden(String),

    /// Bad request with message
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Request conflicts with the current state of the resource
    #[error("{0}")]
    Conflict(String),

    #[error("Too many failed attempts, try again later")]
    TooManyRequests,

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotPermitted { .. } => ApiError::Forbidden(err.to_string()),
            LifecycleError::IllegalTransition { .. } => ApiError::Conflict(err.to_string()),
            LifecycleError::UnknownStatus(_)
            | LifecycleError::UnknownRole(_)
            | LifecycleError::UnknownAlertType(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

// Extractor rejections keep the `{"error": msg}` body of every other failure
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let error_message = match self {
            ApiError::Database(_) => "Database error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use common::AlertStatus;

    #[test]
    fn lifecycle_errors_map_to_http_status() {
        let forbidden: ApiError = LifecycleError::NotPermitted {
            from: AlertStatus::Pending,
            to: AlertStatus::Resolved,
        }
        .into();
        assert_eq!(forbidden.into_response().status(), StatusCode::FORBIDDEN);

        let conflict: ApiError = LifecycleError::IllegalTransition {
            from: AlertStatus::Solved,
            to: AlertStatus::Resolved,
        }
        .into();
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let bad: ApiError = LifecycleError::UnknownStatus("archived".to_string()).into();
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn database_details_are_not_leaked() {
        let err = ApiError::Database(DatabaseError::Migration("secret".to_string()));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
