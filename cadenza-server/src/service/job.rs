//! Job Service
//!
//! Business logic for the job lifecycle: submission, reads, deletion,
//! manual refresh, downloads, and the local profile.

use cadenza_client::{BodyBuilder, ClientError, ProviderApi};
use cadenza_core::domain::job::{
    ContinuationSource, GenerationMode, Job, JobStats, JobUpdate, LifecycleState,
};
use cadenza_core::domain::profile::{DEFAULT_OWNER_ID, UserProfile};
use cadenza_core::dto::job::{PollerHealth, SubmitParams};
use cadenza_core::dto::profile::UpsertProfile;
use cadenza_core::dto::provider::{DownloadLink, GenerationBody};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::repository::{JobStore, ProfileStore, StoreError};
use crate::scheduler::StatusPoller;

/// Message stored on jobs found without a task id at startup
pub const INTERRUPTED_SUBMISSION: &str = "Submission interrupted before the provider accepted it";

/// Service error type
#[derive(Debug)]
pub enum JobError {
    NotFound(Uuid),
    ValidationError(String),
    InvalidState(String),
    ProviderError(ClientError),
    StoreError(StoreError),
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        JobError::StoreError(err)
    }
}

impl From<ClientError> for JobError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Validation(msg) => JobError::ValidationError(msg),
            other => JobError::ProviderError(other),
        }
    }
}

/// Entry point for everything the API and CLI can do with jobs
pub struct JobController {
    store: Arc<JobStore>,
    profiles: Arc<ProfileStore>,
    provider: Arc<dyn ProviderApi>,
    poller: StatusPoller,
    bodies: BodyBuilder,
}

impl JobController {
    pub fn new(
        store: Arc<JobStore>,
        profiles: Arc<ProfileStore>,
        provider: Arc<dyn ProviderApi>,
        poller: StatusPoller,
        bodies: BodyBuilder,
    ) -> Self {
        Self {
            store,
            profiles,
            provider,
            poller,
            bodies,
        }
    }

    pub fn poller(&self) -> &StatusPoller {
        &self.poller
    }

    // =============================================================================
    // Submission
    // =============================================================================

    /// Records a new job and hands it to the provider in the background
    ///
    /// The request body is built first, so invalid input is rejected before
    /// any record exists. Returns the local id as soon as the record is
    /// stored; the outcome of the provider call lands in the record.
    pub async fn submit(&self, params: SubmitParams) -> Result<Uuid, JobError> {
        let body = self.bodies.build(&params)?;
        let owner_id = self.resolve_owner(params.owner_id.as_deref()).await?;

        let job = self.store.create(new_job(owner_id, params)).await?;
        info!("Job {} created ({} mode)", job.id, job.mode);

        let store = self.store.clone();
        let provider = self.provider.clone();
        let poller = self.poller.clone();
        let job_id = job.id;
        tokio::spawn(async move {
            run_submission(store, provider, poller, job_id, body).await;
        });

        Ok(job_id)
    }

    // =============================================================================
    // Reads
    // =============================================================================

    pub async fn get(&self, id: Uuid) -> Result<Job, JobError> {
        self.store.get(id).await?.ok_or(JobError::NotFound(id))
    }

    /// Jobs of one owner, or every job when no owner is given
    pub async fn list(&self, owner_id: Option<&str>) -> Result<Vec<Job>, JobError> {
        let jobs = match owner_id {
            Some(owner_id) => self.store.list_by_owner(owner_id).await?,
            None => self.store.list_all().await?,
        };
        Ok(jobs)
    }

    pub async fn stats(&self, owner_id: Option<&str>) -> Result<JobStats, JobError> {
        Ok(self.store.stats(owner_id).await?)
    }

    pub fn poller_health(&self) -> PollerHealth {
        PollerHealth {
            active_loops: self.poller.active_count(),
            empty_completions: self.poller.empty_completions(),
        }
    }

    // =============================================================================
    // Mutations
    // =============================================================================

    /// Stops polling and removes the record; absent ids are a no-op
    pub async fn delete(&self, id: Uuid) -> Result<bool, JobError> {
        self.poller.cancel(id);
        let deleted = self.store.delete(id).await?;
        if deleted {
            info!("Job {} deleted", id);
        }
        Ok(deleted)
    }

    /// Runs one immediate status check and returns the stored record
    ///
    /// Terminal jobs and jobs the provider has not accepted yet are returned
    /// as they are.
    pub async fn refresh(&self, id: Uuid) -> Result<Job, JobError> {
        let job = self.get(id).await?;
        if job.lifecycle_state.is_terminal() {
            return Ok(job);
        }
        let Some(task_id) = job.remote_task_id.clone() else {
            return Ok(job);
        };

        if let Err(e) = self.poller.poll_once(id, &task_id).await {
            warn!("Manual refresh of job {} failed: {:#}", id, e);
        }

        self.get(id).await
    }

    /// Resolves the high-quality download link of a completed job
    pub async fn download_link(&self, id: Uuid) -> Result<DownloadLink, JobError> {
        let job = self.get(id).await?;
        if job.lifecycle_state != LifecycleState::Completed {
            return Err(JobError::InvalidState(format!(
                "Job {} is not completed (current: {:?})",
                id, job.lifecycle_state
            )));
        }

        let clip_id = job
            .result
            .and_then(|result| result.clip_id)
            .ok_or_else(|| JobError::InvalidState(format!("Job {} has no clip id", id)))?;

        Ok(self.provider.get_download_link(&clip_id).await?)
    }

    /// Restarts polling for unfinished jobs after a restart
    ///
    /// Jobs that never received a task id cannot be recovered and are failed.
    /// Returns the number of loops started.
    pub async fn resume(&self) -> Result<usize, JobError> {
        let mut resumed = 0;

        for job in self.store.list_all().await? {
            if job.lifecycle_state.is_terminal() {
                continue;
            }

            match job.remote_task_id {
                Some(task_id) => {
                    if self.poller.start(job.id, task_id) {
                        resumed += 1;
                    }
                }
                None => {
                    warn!("Job {} was interrupted during submission", job.id);
                    self.store
                        .update(job.id, JobUpdate::failed(INTERRUPTED_SUBMISSION))
                        .await?;
                }
            }
        }

        Ok(resumed)
    }

    // =============================================================================
    // Profile & Data
    // =============================================================================

    pub async fn profile(&self) -> Result<Option<UserProfile>, JobError> {
        Ok(self.profiles.current().await?)
    }

    pub async fn update_profile(&self, req: UpsertProfile) -> Result<UserProfile, JobError> {
        Ok(self.profiles.upsert(req).await?)
    }

    /// Stops every loop and removes all jobs and the profile
    pub async fn clear_all_data(&self) -> Result<(), JobError> {
        let stopped = self.poller.cancel_all();
        self.store.clear().await?;
        self.profiles.clear().await?;
        info!("All data cleared ({} polling loop(s) stopped)", stopped);
        Ok(())
    }

    async fn resolve_owner(&self, requested: Option<&str>) -> Result<String, JobError> {
        if let Some(owner) = requested.map(str::trim).filter(|o| !o.is_empty()) {
            return Ok(owner.to_string());
        }

        Ok(self
            .profiles
            .current()
            .await?
            .map(|profile| profile.id)
            .unwrap_or_else(|| DEFAULT_OWNER_ID.to_string()))
    }
}

/// Submits the body and starts polling; failures are written to the record
async fn run_submission(
    store: Arc<JobStore>,
    provider: Arc<dyn ProviderApi>,
    poller: StatusPoller,
    job_id: Uuid,
    body: GenerationBody,
) {
    let outcome = provider.submit_job(&body).await;

    let stored = match outcome {
        Ok(task_id) => {
            info!("Job {} accepted as task {}", job_id, task_id);
            match store.update(job_id, JobUpdate::accepted(task_id.clone())).await {
                Ok(Some(_)) => {
                    poller.start(job_id, task_id);
                    return;
                }
                other => other,
            }
        }
        Err(e) => {
            error!("Submission of job {} failed: {}", job_id, e);
            store
                .update(job_id, JobUpdate::failed(submission_failure(&e)))
                .await
        }
    };

    match stored {
        Ok(Some(_)) => {}
        Ok(None) => info!("Job {} was deleted during submission", job_id),
        Err(e) => error!("Failed to record submission outcome of job {}: {}", job_id, e),
    }
}

fn submission_failure(err: &ClientError) -> String {
    match err {
        ClientError::ProviderRejected { message, .. } => {
            format!("Provider rejected the request: {}", message)
        }
        ClientError::Network(e) if e.is_timeout() => "Provider did not respond in time".to_string(),
        ClientError::Network(_) => "Could not reach the provider".to_string(),
        ClientError::Validation(message) => message.clone(),
    }
}

fn new_job(owner_id: String, params: SubmitParams) -> Job {
    let continuation = match params.mode {
        GenerationMode::Continuation => match (params.source_task_id, params.source_clip_id) {
            (Some(task_id), Some(clip_id)) => Some(ContinuationSource {
                task_id,
                clip_id,
                continue_at: params.continue_at.unwrap_or_default(),
            }),
            _ => None,
        },
        _ => None,
    };

    let now = chrono::Utc::now();
    Job {
        id: Uuid::new_v4(),
        owner_id,
        remote_task_id: None,
        mode: params.mode,
        prompt_text: params.prompt_text,
        style_tags: params.style_tags,
        title: params.title,
        requested_duration_seconds: params.requested_duration_seconds,
        instrumental_only: params.instrumental_only,
        continuation,
        lifecycle_state: LifecycleState::Submitting,
        progress_percent: 0,
        result: None,
        error_message: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryKeyValueStore;
    use crate::repository::job::tests::new_job as stored_job;
    use crate::scheduler::poller::tests::{FakeProvider, fast_settings, status, success};
    use cadenza_core::dto::provider::{DEFAULT_MODEL_VERSION, ProviderStatus};
    use std::time::Duration;

    fn controller(provider: FakeProvider) -> (JobController, Arc<FakeProvider>) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = Arc::new(JobStore::new(kv.clone()));
        let profiles = Arc::new(ProfileStore::new(kv));
        let provider = Arc::new(provider);
        let poller = StatusPoller::new(store.clone(), provider.clone(), fast_settings(20));

        (
            JobController::new(
                store,
                profiles,
                provider.clone(),
                poller,
                BodyBuilder::new(DEFAULT_MODEL_VERSION),
            ),
            provider,
        )
    }

    async fn wait_for_terminal(controller: &JobController, id: Uuid) -> Job {
        for _ in 0..400 {
            let job = controller.get(id).await.unwrap();
            if job.lifecycle_state.is_terminal() && !controller.poller().is_polling(id) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} never reached a terminal state", id);
    }

    #[tokio::test]
    async fn test_submit_runs_to_completion() {
        let (controller, _) = controller(FakeProvider::with_statuses([
            Ok(status(ProviderStatus::Processing, 40)),
            Ok(success()),
        ]));

        let id = controller
            .submit(SubmitParams::new(GenerationMode::Inspiration, "calm piano"))
            .await
            .unwrap();

        let job = wait_for_terminal(&controller, id).await;
        assert_eq!(job.lifecycle_state, LifecycleState::Completed);
        assert_eq!(job.remote_task_id.as_deref(), Some("task-1"));
        assert_eq!(job.owner_id, DEFAULT_OWNER_ID);
        assert!(!job.result.unwrap().audio_url.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_continuation_creates_no_job() {
        let (controller, provider) = controller(FakeProvider::new());

        let params = SubmitParams {
            source_clip_id: Some("clip-1".to_string()),
            continue_at: Some(30.0),
            ..SubmitParams::new(GenerationMode::Continuation, "more")
        };

        let err = controller.submit(params).await.unwrap_err();
        assert!(matches!(err, JobError::ValidationError(_)));
        assert!(controller.list(None).await.unwrap().is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_rejected_submission_marks_job_failed() {
        let provider = FakeProvider::new();
        *provider.submit.lock().unwrap() = Some(Err("insufficient credits".to_string()));
        let (controller, provider) = controller(provider);

        let id = controller
            .submit(SubmitParams::new(GenerationMode::Custom, "[Verse]\nHello"))
            .await
            .unwrap();

        let job = wait_for_terminal(&controller, id).await;
        assert_eq!(job.lifecycle_state, LifecycleState::Failed);
        assert_eq!(
            job.error_message.as_deref(),
            Some("Provider rejected the request: insufficient credits")
        );
        assert!(job.remote_task_id.is_none());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_owner_defaults_to_profile() {
        let (controller, _) = controller(FakeProvider::with_statuses([Ok(success())]));
        let profile = controller
            .update_profile(UpsertProfile {
                name: Some("Ada".to_string()),
                email: None,
            })
            .await
            .unwrap();

        let id = controller
            .submit(SubmitParams::new(GenerationMode::Inspiration, "lofi"))
            .await
            .unwrap();
        let job = controller.get(id).await.unwrap();
        assert_eq!(job.owner_id, profile.id);

        let explicit = controller
            .submit(SubmitParams {
                owner_id: Some("bob".to_string()),
                ..SubmitParams::new(GenerationMode::Inspiration, "lofi")
            })
            .await
            .unwrap();
        assert_eq!(controller.list(Some("bob")).await.unwrap()[0].id, explicit);
    }

    #[tokio::test]
    async fn test_delete_cancels_polling() {
        let (controller, _) = controller(FakeProvider::with_statuses([Ok(status(
            ProviderStatus::Processing,
            10,
        ))]));

        let id = controller
            .submit(SubmitParams::new(GenerationMode::Inspiration, "lofi"))
            .await
            .unwrap();

        for _ in 0..200 {
            if controller.poller().is_polling(id) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        assert!(controller.delete(id).await.unwrap());
        assert!(!controller.poller().is_polling(id));
        assert!(!controller.delete(id).await.unwrap());
        assert!(matches!(controller.get(id).await, Err(JobError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_download_requires_completed_job() {
        let (controller, _) = controller(FakeProvider::with_statuses([Ok(success())]));

        let pending = controller.store.create(stored_job("local")).await.unwrap();
        assert!(matches!(
            controller.download_link(pending.id).await,
            Err(JobError::InvalidState(_))
        ));

        let id = controller
            .submit(SubmitParams::new(GenerationMode::Inspiration, "lofi"))
            .await
            .unwrap();
        wait_for_terminal(&controller, id).await;

        let link = controller.download_link(id).await.unwrap();
        assert_eq!(link.clip_id, "clip-1");
        assert_eq!(link.file_url, "https://cdn.example/clip-1.wav");
    }

    #[tokio::test]
    async fn test_refresh_applies_one_status_check() {
        let (controller, provider) = controller(FakeProvider::with_statuses([Ok(status(
            ProviderStatus::Processing,
            55,
        ))]));

        let job = controller.store.create(stored_job("local")).await.unwrap();
        controller
            .store
            .update(job.id, JobUpdate::accepted("task-9"))
            .await
            .unwrap();

        let refreshed = controller.refresh(job.id).await.unwrap();
        assert_eq!(refreshed.lifecycle_state, LifecycleState::Processing);
        assert_eq!(refreshed.progress_percent, 55);
        assert_eq!(provider.calls(), 1);
        assert!(!controller.poller().is_polling(job.id));
    }

    #[tokio::test]
    async fn test_resume_restarts_and_fails_interrupted_jobs() {
        let (controller, _) = controller(FakeProvider::with_statuses([Ok(success())]));

        let accepted = controller.store.create(stored_job("local")).await.unwrap();
        controller
            .store
            .update(accepted.id, JobUpdate::accepted("task-1"))
            .await
            .unwrap();
        let interrupted = controller.store.create(stored_job("local")).await.unwrap();

        assert_eq!(controller.resume().await.unwrap(), 1);

        let job = controller.get(interrupted.id).await.unwrap();
        assert_eq!(job.lifecycle_state, LifecycleState::Failed);
        assert_eq!(job.error_message.as_deref(), Some(INTERRUPTED_SUBMISSION));

        let job = wait_for_terminal(&controller, accepted.id).await;
        assert_eq!(job.lifecycle_state, LifecycleState::Completed);
    }

    #[tokio::test]
    async fn test_clear_all_data() {
        let (controller, _) = controller(FakeProvider::new());
        controller.store.create(stored_job("local")).await.unwrap();
        controller
            .update_profile(UpsertProfile::default())
            .await
            .unwrap();

        controller.clear_all_data().await.unwrap();
        assert!(controller.list(None).await.unwrap().is_empty());
        assert!(controller.profile().await.unwrap().is_none());
        assert_eq!(controller.stats(None).await.unwrap().total, 0);
    }
}
