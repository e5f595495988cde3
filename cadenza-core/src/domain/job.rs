//! Job domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generation job record
///
/// Structure shared between the server (persists and polls) and the CLI (renders).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub owner_id: String,
    pub remote_task_id: Option<String>,
    pub mode: GenerationMode,
    pub prompt_text: String,
    pub style_tags: Option<String>,
    pub title: Option<String>,
    pub requested_duration_seconds: Option<u32>,
    #[serde(default)]
    pub instrumental_only: bool,
    pub continuation: Option<ContinuationSource>,
    pub lifecycle_state: LifecycleState,
    #[serde(default)]
    pub progress_percent: u8,
    pub result: Option<TrackResult>,
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Request shape selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    Inspiration,
    Custom,
    Continuation,
}

/// Lifecycle of a job as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Submitting,
    Processing,
    Completed,
    Failed,
}

/// Source clip a continuation job extends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationSource {
    pub task_id: String,
    pub clip_id: String,
    pub continue_at: f64,
}

/// Generated track, copied from the first provider result on completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackResult {
    pub audio_url: String,
    pub cover_url: Option<String>,
    pub duration_seconds: Option<f64>,
    pub clip_id: Option<String>,
    pub video_url: Option<String>,
}

/// Partial update merged into a stored job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub remote_task_id: Option<String>,
    pub lifecycle_state: Option<LifecycleState>,
    pub progress_percent: Option<u8>,
    pub result: Option<TrackResult>,
    pub error_message: Option<String>,
}

/// Per-state job counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    pub total: usize,
    pub submitting: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Inspiration => "inspiration",
            GenerationMode::Custom => "custom",
            GenerationMode::Continuation => "continuation",
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LifecycleState {
    /// Completed and failed jobs are never polled or transitioned again
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Completed | LifecycleState::Failed)
    }
}

impl JobUpdate {
    /// Provider accepted the submission
    pub fn accepted(task_id: impl Into<String>) -> Self {
        Self {
            remote_task_id: Some(task_id.into()),
            ..Default::default()
        }
    }

    /// Provider reports work in progress
    pub fn processing(progress_percent: u8) -> Self {
        Self {
            lifecycle_state: Some(LifecycleState::Processing),
            progress_percent: Some(progress_percent),
            ..Default::default()
        }
    }

    /// Provider finished and returned at least one track
    pub fn completed(progress_percent: u8, result: TrackResult) -> Self {
        Self {
            lifecycle_state: Some(LifecycleState::Completed),
            progress_percent: Some(progress_percent),
            result: Some(result),
            ..Default::default()
        }
    }

    /// Job ended without a track
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            lifecycle_state: Some(LifecycleState::Failed),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}

impl Job {
    /// Merges a partial update into the record.
    ///
    /// `remote_task_id` is write-once. Entering `completed` clears any error and
    /// entering `failed` clears any result, so at most one of the two is present.
    ///
    /// Returns `false` if the update tried to replace an existing remote task id.
    pub fn apply(&mut self, update: JobUpdate) -> bool {
        let mut clean = true;

        if let Some(task_id) = update.remote_task_id {
            match &self.remote_task_id {
                Some(existing) if *existing != task_id => clean = false,
                Some(_) => {}
                None => self.remote_task_id = Some(task_id),
            }
        }

        if let Some(progress) = update.progress_percent {
            self.progress_percent = progress.min(100);
        }

        if let Some(state) = update.lifecycle_state {
            self.lifecycle_state = state;
            match state {
                LifecycleState::Completed => self.error_message = None,
                LifecycleState::Failed => self.result = None,
                _ => {}
            }
        }

        if let Some(result) = update.result {
            if self.lifecycle_state == LifecycleState::Completed {
                self.result = Some(result);
            }
        }

        if let Some(message) = update.error_message {
            if self.lifecycle_state == LifecycleState::Failed {
                self.error_message = Some(message);
            }
        }

        clean
    }

    /// Display title, falling back to the start of the prompt
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) if !title.trim().is_empty() => title.clone(),
            _ => {
                let prompt: String = self.prompt_text.chars().take(50).collect();
                if prompt.trim().is_empty() {
                    "Untitled".to_string()
                } else {
                    prompt
                }
            }
        }
    }
}

impl JobStats {
    /// Counts jobs per lifecycle state
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Self {
        let mut stats = JobStats::default();
        for job in jobs {
            stats.total += 1;
            match job.lifecycle_state {
                LifecycleState::Submitting => stats.submitting += 1,
                LifecycleState::Processing => stats.processing += 1,
                LifecycleState::Completed => stats.completed += 1,
                LifecycleState::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> Job {
        let now = chrono::Utc::now();
        Job {
            id: Uuid::new_v4(),
            owner_id: "local".to_string(),
            remote_task_id: None,
            mode: GenerationMode::Custom,
            prompt_text: "[Verse]\nHello".to_string(),
            style_tags: Some("pop".to_string()),
            title: None,
            requested_duration_seconds: Some(120),
            instrumental_only: false,
            continuation: None,
            lifecycle_state: LifecycleState::Submitting,
            progress_percent: 0,
            result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_track() -> TrackResult {
        TrackResult {
            audio_url: "https://cdn.example/a.mp3".to_string(),
            cover_url: None,
            duration_seconds: Some(98.5),
            clip_id: Some("clip-1".to_string()),
            video_url: None,
        }
    }

    #[test]
    fn test_remote_task_id_is_write_once() {
        let mut job = sample_job();
        assert!(job.apply(JobUpdate::accepted("task-1")));
        assert!(job.apply(JobUpdate::accepted("task-1")));
        assert!(!job.apply(JobUpdate::accepted("task-2")));
        assert_eq!(job.remote_task_id.as_deref(), Some("task-1"));
    }

    #[test]
    fn test_completed_clears_error_and_failed_clears_result() {
        let mut job = sample_job();
        job.apply(JobUpdate::completed(100, sample_track()));
        assert_eq!(job.lifecycle_state, LifecycleState::Completed);
        assert!(job.result.is_some());
        assert!(job.error_message.is_none());

        job.apply(JobUpdate::failed("boom"));
        assert!(job.result.is_none());
        assert_eq!(job.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_result_ignored_outside_completed() {
        let mut job = sample_job();
        job.apply(JobUpdate {
            result: Some(sample_track()),
            ..Default::default()
        });
        assert!(job.result.is_none());
    }

    #[test]
    fn test_progress_may_regress_but_is_capped() {
        let mut job = sample_job();
        job.apply(JobUpdate::processing(60));
        job.apply(JobUpdate::processing(40));
        assert_eq!(job.progress_percent, 40);
        job.apply(JobUpdate::processing(250));
        assert_eq!(job.progress_percent, 100);
    }

    #[test]
    fn test_display_title_falls_back_to_prompt() {
        let mut job = sample_job();
        assert_eq!(job.display_title(), "[Verse]\nHello");
        job.title = Some("Weekend".to_string());
        assert_eq!(job.display_title(), "Weekend");
    }

    #[test]
    fn test_stats_from_jobs() {
        let mut done = sample_job();
        done.apply(JobUpdate::completed(100, sample_track()));
        let pending = sample_job();

        let stats = JobStats::from_jobs([&done, &pending]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.submitting, 1);
    }

    #[test]
    fn test_mode_serializes_snake_case() {
        let json = serde_json::to_string(&GenerationMode::Continuation).unwrap();
        assert_eq!(json, "\"continuation\"");
        assert!(LifecycleState::Failed.is_terminal());
        assert!(!LifecycleState::Processing.is_terminal());
    }
}
