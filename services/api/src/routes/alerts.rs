//! Alert routes: creation, scoped listings and status transitions

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use common::lifecycle::allowed_targets;
use common::{Actor, Alert, AlertStatus, AlertType, Position, check_transition};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::{AuthUser, load_caller, require_admin},
    models::{
        AlertFilter, AlertListResponse, AlertQuery, AlertResponse, CreateAlertRequest, NewAlert,
        UpdateStatusRequest,
    },
    validation::{validate_description, validate_position, validate_title},
};

/// Public listing, optionally filtered by status and type
pub async fn list_public(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<AlertQuery>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let filter = AlertFilter {
        status: query
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<AlertStatus>)
            .transpose()?,
        alert_type: query
            .alert_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::parse::<AlertType>)
            .transpose()?,
        reporter: None,
        limit: query.limit,
    };

    let alerts = state.alerts.list(filter).await?;
    Ok(Json(AlertListResponse { alerts }))
}

pub async fn get_alert(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let alert = state
        .alerts
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Alert not found".to_string()))?;

    Ok(Json(serde_json::json!({ "alert": alert })))
}

/// Report a new alert as the caller
pub async fn create_alert(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateAlertRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let caller = load_caller(&state, &auth).await?;

    let title = validate_title(&payload.title).map_err(ApiError::BadRequest)?;
    let description = validate_description(&payload.description).map_err(ApiError::BadRequest)?;
    let alert_type: AlertType = payload.alert_type.parse()?;
    let position = Position::new(
        payload.latitude,
        payload.longitude,
        payload.accuracy.unwrap_or(0.0),
    );
    validate_position(&position).map_err(ApiError::BadRequest)?;

    let alert = state
        .alerts
        .insert(NewAlert {
            title,
            description,
            alert_type,
            position,
            user_id: caller.identity.id,
        })
        .await?;

    info!(alert_id = %alert.id, reporter = %alert.user_id, "Alert created");

    Ok((
        StatusCode::CREATED,
        Json(AlertResponse {
            message: "Alert created successfully".to_string(),
            alert,
        }),
    ))
}

/// Alerts reported by the caller
pub async fn list_own(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let alerts = state.alerts.list(AlertFilter::by_reporter(auth.id)).await?;
    Ok(Json(AlertListResponse { alerts }))
}

/// Every alert, admin only
pub async fn list_all(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&state, &auth).await?;
    let alerts = state.alerts.list(AlertFilter::default()).await?;
    Ok(Json(AlertListResponse { alerts }))
}

/// Status change requested by the caller
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateStatusRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let to: AlertStatus = payload
        .status
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Status is required".to_string()))?
        .parse()?;

    let alert = apply_transition(&state, &auth, id, to).await?;
    Ok(Json(AlertResponse {
        message: "Alert updated successfully".to_string(),
        alert,
    }))
}

/// Reporter marks their own alert as solved
pub async fn dismiss(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let alert = apply_transition(&state, &auth, id, AlertStatus::Solved).await?;
    Ok(Json(AlertResponse {
        message: "Alert marked as solved".to_string(),
        alert,
    }))
}

/// Check the caller against the lifecycle table, then write with a
/// compare-and-set on the status that was checked.
async fn apply_transition(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    to: AlertStatus,
) -> ApiResult<Alert> {
    let caller = load_caller(state, auth).await?;
    let alert = state
        .alerts
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Alert not found".to_string()))?;

    let actor = Actor::for_alert(caller.identity.id, caller.identity.role, &alert);
    if let Err(e) = check_transition(alert.status, to, actor) {
        warn!(
            alert_id = %id,
            user_id = %auth.id,
            allowed = ?allowed_targets(alert.status, actor),
            "Rejected transition: {}",
            e
        );
        return Err(e.into());
    }

    let updated = state
        .alerts
        .update_status(id, alert.status, to)
        .await?
        .ok_or_else(|| {
            ApiError::Conflict(format!(
                "Alert is no longer '{}'; reload and retry",
                alert.status
            ))
        })?;

    info!(alert_id = %id, from = %alert.status, to = %to, "Alert status changed");
    Ok(updated)
}
