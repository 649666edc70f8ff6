//! Middleware for bearer token validation and authentication

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use common::{Identity, Role};
use tracing::{debug, error};
use uuid::Uuid;

use crate::{AppState, error::ApiError, repositories::UserRecord};

/// Caller identity as asserted by a valid, unrevoked token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    /// Role at token issuance; re-read from the store before trusting it
    pub role: Role,
    pub token_id: Uuid,
    /// Seconds until the token expires
    pub token_ttl: u64,
}

/// Validate the bearer token and attach an [`AuthUser`] to the request
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = state
        .jwt_service
        .validate_token(bearer.token())
        .map_err(|e| {
            debug!("Failed to validate token: {}", e);
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })?;

    let revoked = state.denylist.is_revoked(claims.jti).await.map_err(|e| {
        error!("Failed to check if token is revoked: {}", e);
        ApiError::InternalServerError
    })?;
    if revoked {
        return Err(ApiError::Unauthorized("Token has been revoked".to_string()));
    }

    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        role: claims.role,
        token_id: claims.jti,
        token_ttl: claims.remaining_lifetime(),
    });

    Ok(next.run(req).await)
}

/// Load the caller's stored record
pub async fn load_caller(state: &AppState, auth: &AuthUser) -> Result<UserRecord, ApiError> {
    state
        .users
        .find_by_id(auth.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))
}

/// Load the caller and require the stored role to be admin
pub async fn require_admin(state: &AppState, auth: &AuthUser) -> Result<Identity, ApiError> {
    let caller = load_caller(state, auth).await?;
    if !caller.identity.is_admin() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }
    Ok(caller.identity)
}
