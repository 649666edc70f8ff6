//! Identity routes: registration, login, profile, PIN upgrade, logout

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use common::{Identity, Role};
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::{AuthUser, load_caller, require_admin},
    models::{
        AuthResponse, LoginRequest, ProfileResponse, RegisterRequest, UpgradeRequest,
        UserListResponse,
    },
    repositories::{NewUser, hash_password, verify_password},
    validation::{validate_email, validate_name, validate_password},
};

fn issue(state: &AppState, identity: &Identity) -> ApiResult<String> {
    state.jwt_service.issue(identity).map_err(|e| {
        error!("Failed to generate access token: {}", e);
        ApiError::InternalServerError
    })
}

/// User registration endpoint
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let name = validate_name(&payload.name).map_err(ApiError::BadRequest)?;
    let email = validate_email(&payload.email).map_err(ApiError::BadRequest)?;
    validate_password(&payload.password).map_err(ApiError::BadRequest)?;

    if let Some(requested) = payload.role.as_deref().filter(|r| *r != Role::User.as_str()) {
        warn!(
            "Registration for {} requested role '{}', granting 'user'",
            email, requested
        );
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        error!("{}", e);
        ApiError::InternalServerError
    })?;

    let identity = state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
            role: Role::User,
        })
        .await?
        .ok_or_else(|| ApiError::BadRequest("Email already registered".to_string()))?;

    info!("Registered user {}", identity.id);
    let access_token = issue(&state, &identity)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            access_token,
            user: identity,
        }),
    ))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password required".to_string(),
        ));
    }

    let limiter_key = format!("login:{}", email);
    if !state.rate_limiter.is_allowed(&limiter_key).await {
        return Err(ApiError::TooManyRequests);
    }

    let record = state.users.find_by_email(&email).await?;
    let verified = match &record {
        Some(record) => verify_password(record, &payload.password).map_err(|e| {
            error!("{}", e);
            ApiError::InternalServerError
        })?,
        None => false,
    };

    let Some(record) = record.filter(|_| verified) else {
        state.rate_limiter.record_failure(&limiter_key).await;
        info!("Failed login attempt for {}", email);
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    };
    state.rate_limiter.reset(&limiter_key).await;

    let now = Utc::now();
    state.users.record_login(record.identity.id, now).await?;
    let identity = Identity {
        last_login: Some(now),
        ..record.identity
    };

    info!("User {} logged in", identity.id);
    let access_token = issue(&state, &identity)?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        access_token,
        user: identity,
    }))
}

/// Profile of the token's identity
pub async fn profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let caller = load_caller(&state, &auth).await?;
    Ok(Json(ProfileResponse {
        user: caller.identity,
    }))
}

/// Elevate the caller to admin with the shared PIN.
///
/// On success the presented token is revoked and replaced, so the caller
/// cannot keep using a credential that encodes the old role.
pub async fn upgrade_to_admin(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(payload), _): WithRejection<Json<UpgradeRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let pin = payload
        .pin
        .as_deref()
        .map(str::trim)
        .filter(|pin| !pin.is_empty())
        .ok_or_else(|| ApiError::BadRequest("PIN code required".to_string()))?;

    let limiter_key = format!("pin:{}", auth.id);
    if !state.rate_limiter.is_allowed(&limiter_key).await {
        return Err(ApiError::TooManyRequests);
    }

    let caller = load_caller(&state, &auth).await?;

    if pin != &*state.admin_pin {
        state.rate_limiter.record_failure(&limiter_key).await;
        warn!("Invalid admin PIN from user {}", auth.id);
        return Err(ApiError::Unauthorized("Invalid PIN code".to_string()));
    }
    state.rate_limiter.reset(&limiter_key).await;

    // The presented token must be dead before the stored role changes
    state
        .denylist
        .revoke(auth.token_id, auth.token_ttl)
        .await
        .map_err(|e| {
            error!("Failed to revoke replaced token: {}", e);
            ApiError::InternalServerError
        })?;

    let (identity, message) = if caller.identity.is_admin() {
        (caller.identity, "User is already an admin")
    } else {
        let identity = state
            .users
            .set_role(auth.id, Role::Admin)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;
        info!("User {} upgraded to admin", identity.id);
        (identity, "Successfully upgraded to admin")
    };

    let access_token = issue(&state, &identity)?;

    Ok(Json(AuthResponse {
        message: message.to_string(),
        access_token,
        user: identity,
    }))
}

/// Revoke the presented token
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    state
        .denylist
        .revoke(auth.token_id, auth.token_ttl)
        .await
        .map_err(|e| {
            error!("Failed to revoke token: {}", e);
            ApiError::InternalServerError
        })?;

    info!("User {} logged out", auth.id);
    Ok(Json(json!({"message": "Logged out successfully"})))
}

/// All identities, admin only
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&state, &auth).await?;
    let users = state.users.list().await?;
    Ok(Json(UserListResponse { users }))
}
