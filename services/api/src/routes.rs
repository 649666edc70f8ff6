//! API service routes

use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use crate::{AppState, middleware::auth_middleware};

pub mod alerts;
pub mod auth;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/auth/profile", get(auth::profile))
        .route("/api/auth/upgrade-to-admin", post(auth::upgrade_to_admin))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/alerts", post(alerts::create_alert))
        .route("/api/alerts/user", get(alerts::list_own))
        .route("/api/alerts/:id", put(alerts::update_status))
        .route("/api/alerts/:id/dismiss", put(alerts::dismiss))
        .route("/api/admin/alerts", get(alerts::list_all))
        .route("/api/admin/users", get(auth::list_users))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/alerts", get(alerts::list_public))
        .route("/api/alerts/:id", get(alerts::get_alert))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "treelives-api"
    }))
}
