//! API Module
//!
//! HTTP API layer for the server.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod job;
pub mod profile;

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::service::JobController;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<JobController>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/health/poller", get(health::poller_health))
        // Job endpoints
        .route("/api/jobs", post(job::submit_job).get(job::list_jobs))
        .route("/api/jobs/stats", get(job::job_stats))
        .route("/api/jobs/{id}", get(job::get_job).delete(job::delete_job))
        .route("/api/jobs/{id}/refresh", post(job::refresh_job))
        .route("/api/jobs/{id}/download", get(job::download_job))
        // Profile endpoints
        .route(
            "/api/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/api/data", delete(profile::clear_data))
        // Add state and middleware
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
