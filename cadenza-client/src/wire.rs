//! Provider wire formats
//!
//! The provider is loose about its response shapes: ids arrive as `clip_id`
//! or `id`, progress as `45` or `"45%"`, and the payload is sometimes nested
//! one level deeper than documented. Everything here is private; callers only
//! see the normalized types from `cadenza_core::dto::provider`.

use cadenza_core::dto::provider::{ClipResult, DownloadLink, ProviderStatus, TaskStatus};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClientError, Result};

const SUCCESS_CODE: &str = "success";

// =============================================================================
// Raw Shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    task_id: Option<String>,
    status: Option<String>,
    progress: Option<RawProgress>,
    fail_reason: Option<String>,
    message: Option<String>,
    data: Option<Vec<RawClip>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawProgress {
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawClip {
    clip_id: Option<String>,
    id: Option<String>,
    audio_url: Option<String>,
    image_url: Option<String>,
    image_large_url: Option<String>,
    video_url: Option<String>,
    duration: Option<f64>,
    title: Option<String>,
}

impl RawProgress {
    /// Percent clamped to 0..=100; unparseable text counts as zero
    fn percent(&self) -> u8 {
        let value = match self {
            RawProgress::Number(n) => *n,
            RawProgress::Text(text) => text
                .trim()
                .trim_end_matches('%')
                .trim()
                .parse()
                .unwrap_or(0.0),
        };
        if value.is_finite() {
            value.clamp(0.0, 100.0).round() as u8
        } else {
            0
        }
    }
}

impl From<RawClip> for ClipResult {
    fn from(raw: RawClip) -> Self {
        ClipResult {
            clip_id: non_empty(raw.clip_id).or_else(|| non_empty(raw.id)),
            audio_url: non_empty(raw.audio_url),
            cover_url: non_empty(raw.image_url).or_else(|| non_empty(raw.image_large_url)),
            video_url: non_empty(raw.video_url),
            duration_seconds: raw.duration,
            title: non_empty(raw.title),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn envelope(value: Value) -> Result<RawEnvelope> {
    let envelope: RawEnvelope = serde_json::from_value(value)
        .map_err(|e| ClientError::bad_payload(format!("Unexpected response shape: {}", e)))?;

    match envelope.code.clone() {
        Some(code) if !code.eq_ignore_ascii_case(SUCCESS_CODE) => {
            Err(ClientError::bad_payload(envelope.message.unwrap_or_else(|| {
                format!("Provider returned code '{}'", code)
            })))
        }
        _ => Ok(envelope),
    }
}

// =============================================================================
// Parsers
// =============================================================================

/// Extracts the task id from a submission response
pub(crate) fn parse_submit_response(value: Value) -> Result<String> {
    let top_level_id = value
        .get("task_id")
        .or_else(|| value.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let envelope = envelope(value)?;

    let task_id = match &envelope.data {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map.get("task_id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
    .or(top_level_id);

    non_empty(task_id)
        .ok_or_else(|| ClientError::bad_payload("Submission response carried no task id"))
}

/// Normalizes a status response
pub(crate) fn parse_status_response(task_id: &str, value: Value) -> Result<TaskStatus> {
    let envelope = envelope(value)?;

    let raw: RawTask = serde_json::from_value(envelope.data)
        .map_err(|e| ClientError::bad_payload(format!("Unexpected status payload: {}", e)))?;

    let raw_status = raw.status.unwrap_or_default();
    let progress = match &raw.progress {
        Some(progress) => progress.percent(),
        None if is_success(&raw_status) => 100,
        None => 0,
    };

    let status = map_status(&raw_status, progress);
    let message = non_empty(raw.fail_reason).or_else(|| non_empty(raw.message));

    Ok(TaskStatus {
        task_id: non_empty(raw.task_id).unwrap_or_else(|| task_id.to_string()),
        status,
        progress_percent: progress,
        message,
        results: raw
            .data
            .unwrap_or_default()
            .into_iter()
            .map(ClipResult::from)
            .collect(),
    })
}

/// Extracts the WAV link from a download response
pub(crate) fn parse_download_response(clip_id: &str, value: Value) -> Result<DownloadLink> {
    let direct = value
        .get("wav_file_url")
        .or_else(|| value.pointer("/data/wav_file_url"))
        .or_else(|| value.get("file_url"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if direct.is_none() {
        // Only an explicit non-success code turns into a rejection here
        envelope(value)?;
    }

    match non_empty(direct) {
        Some(file_url) => Ok(DownloadLink {
            clip_id: clip_id.to_string(),
            file_url,
        }),
        None => Err(ClientError::bad_payload("Download response carried no file url")),
    }
}

fn is_success(status: &str) -> bool {
    matches!(
        status.to_ascii_uppercase().as_str(),
        "SUCCESS" | "COMPLETE" | "COMPLETED"
    )
}

fn map_status(status: &str, progress: u8) -> ProviderStatus {
    match status.to_ascii_uppercase().as_str() {
        "NOT_START" | "SUBMITTED" | "QUEUED" | "PENDING" => ProviderStatus::Pending,
        "SUCCESS" | "COMPLETE" | "COMPLETED" if progress >= 100 => ProviderStatus::Success,
        "SUCCESS" | "COMPLETE" | "COMPLETED" => ProviderStatus::Processing,
        "FAILED" | "FAILURE" | "ERROR" => ProviderStatus::Failed,
        _ => ProviderStatus::Processing,
    }
}
