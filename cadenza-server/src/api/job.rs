//! Job API Handlers
//!
//! HTTP endpoints for the generation job lifecycle.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use cadenza_core::domain::job::{Job, JobStats};
use cadenza_core::dto::job::{SubmitAccepted, SubmitParams};
use cadenza_core::dto::provider::DownloadLink;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::ApiResult;

// =============================================================================
// Job Lifecycle Endpoints
// =============================================================================

/// POST /api/jobs
/// Record a job and submit it to the provider in the background
pub async fn submit_job(
    State(state): State<AppState>,
    Json(req): Json<SubmitParams>,
) -> ApiResult<(StatusCode, Json<SubmitAccepted>)> {
    tracing::info!("Submitting {} job", req.mode);

    let id = state.controller.submit(req).await?;

    Ok((StatusCode::ACCEPTED, Json(SubmitAccepted { id })))
}

/// GET /api/jobs
/// List jobs, most recent first
///
/// Query parameters:
/// - `owner_id` (optional): Only jobs submitted by this owner
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
) -> ApiResult<Json<Vec<Job>>> {
    tracing::debug!("Listing jobs (owner: {:?})", params.owner_id);

    let jobs = state.controller.list(params.owner_id.as_deref()).await?;
    Ok(Json(jobs))
}

/// GET /api/jobs/stats
/// Per-state job counts
pub async fn job_stats(
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
) -> ApiResult<Json<JobStats>> {
    let stats = state.controller.stats(params.owner_id.as_deref()).await?;
    Ok(Json(stats))
}

/// GET /api/jobs/{id}
/// Get job details by ID
pub async fn get_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    let job = state.controller.get(id).await?;
    Ok(Json(job))
}

/// DELETE /api/jobs/{id}
/// Stop polling and delete a job; succeeds for unknown ids too
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting job: {}", id);

    state.controller.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/jobs/{id}/refresh
/// Check the provider once and return the updated job
pub async fn refresh_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    tracing::debug!("Refreshing job: {}", id);

    let job = state.controller.refresh(id).await?;
    Ok(Json(job))
}

/// GET /api/jobs/{id}/download
/// Resolve the WAV download link of a completed job
pub async fn download_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DownloadLink>> {
    tracing::debug!("Resolving download link for job: {}", id);

    let link = state.controller.download_link(id).await?;
    Ok(Json(link))
}

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner_id: Option<String>,
}
