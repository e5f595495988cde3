//! Profile API Handlers
//!
//! HTTP endpoints for the local profile and for wiping all data.

use axum::{Json, extract::State, http::StatusCode};
use cadenza_core::domain::profile::UserProfile;
use cadenza_core::dto::profile::UpsertProfile;

use crate::api::AppState;
use crate::api::error::ApiResult;

/// GET /api/profile
/// Current profile, or null when none has been created
pub async fn get_profile(State(state): State<AppState>) -> ApiResult<Json<Option<UserProfile>>> {
    let profile = state.controller.profile().await?;
    Ok(Json(profile))
}

/// PUT /api/profile
/// Create or update the profile
pub async fn update_profile(
    State(state): State<AppState>,
    Json(req): Json<UpsertProfile>,
) -> ApiResult<Json<UserProfile>> {
    let profile = state.controller.update_profile(req).await?;
    tracing::info!("Profile {} updated", profile.id);
    Ok(Json(profile))
}

/// DELETE /api/data
/// Remove every job and the profile
pub async fn clear_data(State(state): State<AppState>) -> ApiResult<StatusCode> {
    tracing::info!("Clearing all data");
    state.controller.clear_all_data().await?;
    Ok(StatusCode::NO_CONTENT)
}
