//! Status reconciliation
//!
//! Maps one normalized provider status onto the job lifecycle. Pure: the
//! caller decides what to persist and whether to keep polling.

use cadenza_core::domain::job::{Job, JobUpdate, TrackResult};
use cadenza_core::dto::provider::{ProviderStatus, TaskStatus};

/// Fallback message when the provider fails a task without saying why
pub const GENERIC_FAILURE: &str = "Generation failed";

/// What a status response means for a job
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Job is already terminal; nothing changes
    Unchanged,
    /// Work in progress; the job is (or stays) processing
    Progress(JobUpdate),
    /// Provider reported success without a usable track; stays processing
    EmptyCompletion(JobUpdate),
    /// Job reached completed or failed
    Terminal(JobUpdate),
}

impl Transition {
    /// Whether polling should stop after this transition
    pub fn ends_polling(&self) -> bool {
        matches!(self, Transition::Unchanged | Transition::Terminal(_))
    }

    pub fn into_update(self) -> Option<JobUpdate> {
        match self {
            Transition::Unchanged => None,
            Transition::Progress(update)
            | Transition::EmptyCompletion(update)
            | Transition::Terminal(update) => Some(update),
        }
    }
}

/// Decides the transition for `job` given the provider's `status`
pub fn reconcile(job: &Job, status: &TaskStatus) -> Transition {
    if job.lifecycle_state.is_terminal() {
        return Transition::Unchanged;
    }

    match status.status {
        ProviderStatus::Pending | ProviderStatus::Processing => {
            Transition::Progress(JobUpdate::processing(status.progress_percent))
        }
        ProviderStatus::Success => match first_track(status) {
            Some(track) => Transition::Terminal(JobUpdate::completed(100, track)),
            None => Transition::EmptyCompletion(JobUpdate::processing(status.progress_percent)),
        },
        ProviderStatus::Failed => {
            let message = status
                .message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(GENERIC_FAILURE);
            Transition::Terminal(JobUpdate::failed(message))
        }
    }
}

/// Update applied when the retry budget runs out
pub fn timeout_update(attempts: u32) -> JobUpdate {
    JobUpdate::failed(format!(
        "Generation timed out after {} status checks",
        attempts
    ))
}

/// First result carrying an audio URL
fn first_track(status: &TaskStatus) -> Option<TrackResult> {
    status.results.iter().find_map(|clip| {
        let audio_url = clip.audio_url.as_deref()?.trim();
        if audio_url.is_empty() {
            return None;
        }

        Some(TrackResult {
            audio_url: audio_url.to_string(),
            cover_url: clip.cover_url.clone(),
            duration_seconds: clip.duration_seconds,
            clip_id: clip.clip_id.clone(),
            video_url: clip.video_url.clone(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::job::tests::new_job;
    use cadenza_core::domain::job::LifecycleState;
    use cadenza_core::dto::provider::ClipResult;

    fn status(status: ProviderStatus, progress: u8) -> TaskStatus {
        TaskStatus {
            task_id: "task-1".to_string(),
            status,
            progress_percent: progress,
            message: None,
            results: Vec::new(),
        }
    }

    fn clip(audio_url: Option<&str>) -> ClipResult {
        ClipResult {
            clip_id: Some("clip-1".to_string()),
            audio_url: audio_url.map(str::to_string),
            cover_url: Some("https://cdn.example/c.png".to_string()),
            video_url: None,
            duration_seconds: Some(95.0),
            title: None,
        }
    }

    #[test]
    fn test_pending_moves_to_processing() {
        let job = new_job("local");
        let transition = reconcile(&job, &status(ProviderStatus::Pending, 0));

        assert_eq!(transition, Transition::Progress(JobUpdate::processing(0)));
        assert!(!transition.ends_polling());
    }

    #[test]
    fn test_progress_is_overwritten_even_when_lower() {
        let mut job = new_job("local");
        job.apply(JobUpdate::processing(70));

        let update = reconcile(&job, &status(ProviderStatus::Processing, 40))
            .into_update()
            .unwrap();
        job.apply(update);
        assert_eq!(job.progress_percent, 40);
    }

    #[test]
    fn test_success_copies_first_track() {
        let job = new_job("local");
        let mut done = status(ProviderStatus::Success, 100);
        done.results = vec![clip(Some("https://cdn.example/a.mp3")), clip(Some("https://cdn.example/b.mp3"))];

        let transition = reconcile(&job, &done);
        assert!(transition.ends_polling());

        let mut job = job;
        job.apply(transition.into_update().unwrap());
        assert_eq!(job.lifecycle_state, LifecycleState::Completed);

        let result = job.result.unwrap();
        assert_eq!(result.audio_url, "https://cdn.example/a.mp3");
        assert_eq!(result.clip_id.as_deref(), Some("clip-1"));
        assert_eq!(result.duration_seconds, Some(95.0));
    }

    #[test]
    fn test_success_without_audio_is_empty_completion() {
        let job = new_job("local");
        let mut done = status(ProviderStatus::Success, 100);
        done.results = vec![clip(None), clip(Some("  "))];

        let transition = reconcile(&job, &done);
        assert!(matches!(transition, Transition::EmptyCompletion(_)));
        assert!(!transition.ends_polling());

        assert!(matches!(
            reconcile(&job, &status(ProviderStatus::Success, 100)),
            Transition::EmptyCompletion(_)
        ));
    }

    #[test]
    fn test_failure_uses_provider_message_or_fallback() {
        let job = new_job("local");

        let mut failed = status(ProviderStatus::Failed, 0);
        failed.message = Some("content policy".to_string());
        assert_eq!(
            reconcile(&job, &failed),
            Transition::Terminal(JobUpdate::failed("content policy"))
        );

        failed.message = None;
        assert_eq!(
            reconcile(&job, &failed),
            Transition::Terminal(JobUpdate::failed(GENERIC_FAILURE))
        );
    }

    #[test]
    fn test_terminal_jobs_never_transition() {
        let mut job = new_job("local");
        job.apply(JobUpdate::failed("boom"));

        let mut done = status(ProviderStatus::Success, 100);
        done.results = vec![clip(Some("https://cdn.example/a.mp3"))];

        assert_eq!(reconcile(&job, &done), Transition::Unchanged);
        assert_eq!(reconcile(&job, &status(ProviderStatus::Processing, 10)), Transition::Unchanged);
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(
            timeout_update(60).error_message.as_deref(),
            Some("Generation timed out after 60 status checks")
        );
    }
}
