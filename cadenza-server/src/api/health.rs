//! Health Check API Handlers
//!
//! Liveness and poller counters for monitoring.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use cadenza_core::dto::job::PollerHealth;

use crate::api::AppState;

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /health/poller
/// Active polling loops and empty completions seen so far
pub async fn poller_health(State(state): State<AppState>) -> Json<PollerHealth> {
    Json(state.controller.poller_health())
}
