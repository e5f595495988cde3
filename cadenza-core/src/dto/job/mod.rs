//! Job DTOs for the server API

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::GenerationMode;

/// Request to submit a new generation job
///
/// Continuation fields are optional at this level so that missing values are
/// reported as validation errors rather than as malformed JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitParams {
    pub mode: GenerationMode,
    pub prompt_text: String,
    #[serde(default)]
    pub style_tags: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub requested_duration_seconds: Option<u32>,
    #[serde(default)]
    pub instrumental_only: bool,
    #[serde(default)]
    pub source_task_id: Option<String>,
    #[serde(default)]
    pub source_clip_id: Option<String>,
    #[serde(default)]
    pub continue_at: Option<f64>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// Response returned as soon as a submission has been recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAccepted {
    pub id: Uuid,
}

/// Poller counters exposed for monitoring
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PollerHealth {
    pub active_loops: usize,
    pub empty_completions: u64,
}

impl SubmitParams {
    /// Minimal request for a mode and prompt
    pub fn new(mode: GenerationMode, prompt_text: impl Into<String>) -> Self {
        Self {
            mode,
            prompt_text: prompt_text.into(),
            style_tags: None,
            title: None,
            requested_duration_seconds: None,
            instrumental_only: false,
            source_task_id: None,
            source_clip_id: None,
            continue_at: None,
            owner_id: None,
        }
    }
}
