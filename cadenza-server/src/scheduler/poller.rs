//! Status poller
//!
//! Runs one detached polling loop per accepted job. Each loop waits, asks the
//! provider for the task status, reconciles it into the stored record, and
//! repeats until the job is terminal, its retry budget is spent, or its
//! cancellation token fires.

use anyhow::{Context, Result};
use cadenza_client::ProviderApi;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::reconcile::{self, Transition};
use crate::repository::JobStore;

/// Timing and budget of a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Wait before the first status check
    pub initial_delay: Duration,
    /// Wait after an in-progress response
    pub pending_interval: Duration,
    /// Wait after a failed status check
    pub retry_interval: Duration,
    /// Status checks allowed before the job is failed as timed out
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            pending_interval: Duration::from_secs(5),
            retry_interval: Duration::from_secs(15),
            max_attempts: 60,
        }
    }
}

/// Result of one status check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Job is still in progress
    Pending,
    /// Job reached a terminal state
    Finished,
    /// Job no longer exists
    Gone,
}

struct LoopEntry {
    generation: u64,
    token: CancellationToken,
}

/// Registry and driver of per-job polling loops
///
/// Cheap to clone; all clones share the same registry.
#[derive(Clone)]
pub struct StatusPoller {
    store: Arc<JobStore>,
    provider: Arc<dyn ProviderApi>,
    settings: PollSettings,
    loops: Arc<Mutex<HashMap<Uuid, LoopEntry>>>,
    next_generation: Arc<AtomicU64>,
    empty_completions: Arc<AtomicU64>,
    shutdown: CancellationToken,
}

impl StatusPoller {
    pub fn new(store: Arc<JobStore>, provider: Arc<dyn ProviderApi>, settings: PollSettings) -> Self {
        Self {
            store,
            provider,
            settings,
            loops: Arc::new(Mutex::new(HashMap::new())),
            next_generation: Arc::new(AtomicU64::new(0)),
            empty_completions: Arc::new(AtomicU64::new(0)),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Starts a polling loop for a job
    ///
    /// No-op (returns `false`) if a loop for this job is already running or
    /// the poller has been shut down.
    ///
    /// # Arguments
    /// * `job_id` - Local id of the job
    /// * `task_id` - Provider task id to poll
    pub fn start(&self, job_id: Uuid, task_id: String) -> bool {
        let mut loops = self.lock_loops();

        if self.shutdown.is_cancelled() {
            debug!("Poller is shut down; not starting loop for job {}", job_id);
            return false;
        }
        if loops.contains_key(&job_id) {
            debug!("Job {} is already being polled", job_id);
            return false;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = self.shutdown.child_token();
        loops.insert(
            job_id,
            LoopEntry {
                generation,
                token: token.clone(),
            },
        );
        drop(loops);

        info!("Polling job {} (task {})", job_id, task_id);

        let poller = self.clone();
        tokio::spawn(async move {
            poller.run_loop(job_id, task_id, token).await;
            poller.deregister(job_id, generation);
        });

        true
    }

    /// Stops the loop of one job; returns `false` if none was running
    pub fn cancel(&self, job_id: Uuid) -> bool {
        match self.lock_loops().remove(&job_id) {
            Some(entry) => {
                entry.token.cancel();
                debug!("Cancelled polling for job {}", job_id);
                true
            }
            None => false,
        }
    }

    /// Stops every running loop; new loops can still be started
    pub fn cancel_all(&self) -> usize {
        let entries: Vec<LoopEntry> = self.lock_loops().drain().map(|(_, e)| e).collect();
        for entry in &entries {
            entry.token.cancel();
        }
        entries.len()
    }

    /// Stops every running loop and refuses new ones
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        let stopped = self.lock_loops().drain().count();
        info!("Status poller shut down ({} loop(s) stopped)", stopped);
    }

    pub fn is_polling(&self, job_id: Uuid) -> bool {
        self.lock_loops().contains_key(&job_id)
    }

    pub fn active_count(&self) -> usize {
        self.lock_loops().len()
    }

    /// Success responses that carried no usable track
    pub fn empty_completions(&self) -> u64 {
        self.empty_completions.load(Ordering::Relaxed)
    }

    /// Performs a single status check and writes the result back
    ///
    /// Used by the loops and by manual refreshes; never touches any loop's
    /// retry budget.
    pub async fn poll_once(&self, job_id: Uuid, task_id: &str) -> Result<PollOutcome> {
        let status = self
            .provider
            .get_job_status(task_id)
            .await
            .with_context(|| format!("Status check for task {} failed", task_id))?;

        debug!(
            "Task {} reported {:?} at {}%",
            task_id, status.status, status.progress_percent
        );

        let mut transition = Transition::Unchanged;
        let stored = self
            .store
            .update_with(job_id, |job| {
                transition = reconcile::reconcile(job, &status);
                transition.clone().into_update()
            })
            .await
            .context("Failed to store job status")?;

        let Some(job) = stored else {
            return Ok(PollOutcome::Gone);
        };

        if matches!(transition, Transition::EmptyCompletion(_)) {
            let total = self.empty_completions.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                "Provider reported task {} finished without a track (job {}, {} so far)",
                task_id, job_id, total
            );
        }

        if !transition.ends_polling() {
            return Ok(PollOutcome::Pending);
        }
        if matches!(transition, Transition::Terminal(_)) {
            info!("Job {} is {:?}", job_id, job.lifecycle_state);
        }
        Ok(PollOutcome::Finished)
    }

    async fn run_loop(&self, job_id: Uuid, task_id: String, token: CancellationToken) {
        let mut attempts: u32 = 0;
        let mut delay = self.settings.initial_delay;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Polling loop for job {} cancelled", job_id);
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempts += 1;
            debug!(
                "Status check {}/{} for job {}",
                attempts, self.settings.max_attempts, job_id
            );

            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    debug!("Polling loop for job {} cancelled", job_id);
                    return;
                }
                outcome = self.poll_once(job_id, &task_id) => outcome,
            };

            match outcome {
                Ok(PollOutcome::Finished) | Ok(PollOutcome::Gone) => return,
                Ok(PollOutcome::Pending) => delay = self.settings.pending_interval,
                Err(e) => {
                    warn!("Poll miss for job {}: {:#}", job_id, e);
                    delay = self.settings.retry_interval;
                }
            }

            if attempts >= self.settings.max_attempts {
                self.time_out(job_id, attempts).await;
                return;
            }
        }
    }

    async fn time_out(&self, job_id: Uuid, attempts: u32) {
        let result = self
            .store
            .update_with(job_id, |job| {
                (!job.lifecycle_state.is_terminal()).then(|| reconcile::timeout_update(attempts))
            })
            .await;

        match result {
            Ok(Some(_)) => warn!(
                "Job {} timed out after {} status checks",
                job_id, attempts
            ),
            Ok(None) => {}
            Err(e) => warn!("Failed to mark job {} as timed out: {}", job_id, e),
        }
    }

    fn deregister(&self, job_id: Uuid, generation: u64) {
        let mut loops = self.lock_loops();
        if loops
            .get(&job_id)
            .is_some_and(|entry| entry.generation == generation)
        {
            loops.remove(&job_id);
        }
    }

    fn lock_loops(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, LoopEntry>> {
        self.loops.lock().unwrap_or_else(|e| e.into_inner())
    }
}
