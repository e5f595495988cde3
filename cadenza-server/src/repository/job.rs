//! Job Store
//!
//! Holds every job record as one JSON array under a single storage key,
//! most recent first. All writes are read-modify-write cycles serialized by
//! an async mutex, so concurrent submissions and poll loops in this process
//! never lose each other's updates.

use cadenza_core::domain::job::{Job, JobStats, JobUpdate};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::kv::{KeyValueStore, StoreError};

/// Storage key of the job collection
pub const JOBS_KEY: &str = "generation_jobs";

/// Typed store for job records
pub struct JobStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl JobStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    /// Inserts a new record at the head of the collection
    ///
    /// Stamps `created_at` and `updated_at` with the current time.
    pub async fn create(&self, mut job: Job) -> Result<Job, StoreError> {
        let _guard = self.write_lock.lock().await;

        let now = chrono::Utc::now();
        job.created_at = now;
        job.updated_at = now;

        let mut jobs = self.load().await?;
        jobs.insert(0, job.clone());
        self.save(&jobs).await?;

        debug!("Stored job {}", job.id);
        Ok(job)
    }

    /// Merges a partial update into an existing record
    ///
    /// Returns `None` if no record has this id.
    pub async fn update(&self, id: Uuid, update: JobUpdate) -> Result<Option<Job>, StoreError> {
        self.update_with(id, move |_| Some(update)).await
    }

    /// Computes and applies an update from the current record, atomically
    ///
    /// `decide` sees the stored record under the write lock; returning `None`
    /// leaves the record untouched. Returns the record as stored afterwards,
    /// or `None` if no record has this id.
    pub async fn update_with<F>(&self, id: Uuid, decide: F) -> Result<Option<Job>, StoreError>
    where
        F: FnOnce(&Job) -> Option<JobUpdate> + Send,
    {
        let _guard = self.write_lock.lock().await;

        let mut jobs = self.load().await?;
        let Some(job) = jobs.iter_mut().find(|job| job.id == id) else {
            warn!("Update for unknown job {} ignored", id);
            return Ok(None);
        };

        let Some(update) = decide(job) else {
            return Ok(Some(job.clone()));
        };

        if !job.apply(update) {
            warn!(
                "Job {} already has remote task id {:?}; conflicting value ignored",
                id, job.remote_task_id
            );
        }
        job.updated_at = chrono::Utc::now();

        let updated = job.clone();
        self.save(&jobs).await?;
        Ok(Some(updated))
    }

    /// Removes a record; returns `false` if it did not exist
    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut jobs = self.load().await?;
        let before = jobs.len();
        jobs.retain(|job| job.id != id);

        if jobs.len() == before {
            return Ok(false);
        }

        self.save(&jobs).await?;
        Ok(true)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        let jobs = self.load().await?;
        Ok(jobs.into_iter().find(|job| job.id == id))
    }

    /// All records, most recent first
    pub async fn list_all(&self) -> Result<Vec<Job>, StoreError> {
        self.load().await
    }

    /// Records submitted by one owner, most recent first
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Job>, StoreError> {
        let jobs = self.load().await?;
        Ok(jobs
            .into_iter()
            .filter(|job| job.owner_id == owner_id)
            .collect())
    }

    /// Per-state counts, optionally restricted to one owner
    pub async fn stats(&self, owner_id: Option<&str>) -> Result<JobStats, StoreError> {
        let jobs = self.load().await?;
        Ok(JobStats::from_jobs(jobs.iter().filter(|job| {
            owner_id.is_none_or(|owner| job.owner_id == owner)
        })))
    }

    /// Drops every record
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.kv.remove(JOBS_KEY).await
    }

    async fn load(&self) -> Result<Vec<Job>, StoreError> {
        let Some(raw) = self.kv.get(JOBS_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(jobs) => Ok(jobs),
            Err(e) => {
                warn!("Stored job collection is unreadable, treating it as empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, jobs: &[Job]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(jobs)?;
        self.kv.put(JOBS_KEY, &raw).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::repository::kv::MemoryKeyValueStore;
    use cadenza_core::domain::job::{GenerationMode, LifecycleState, TrackResult};

    pub(crate) fn new_job(owner_id: &str) -> Job {
        let now = chrono::Utc::now();
        Job {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            remote_task_id: None,
            mode: GenerationMode::Inspiration,
            prompt_text: "calm piano at night".to_string(),
            style_tags: None,
            title: None,
            requested_duration_seconds: None,
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

    fn store() -> (Arc<MemoryKeyValueStore>, JobStore) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        (kv.clone(), JobStore::new(kv))
    }

    #[tokio::test]
    async fn test_create_inserts_most_recent_first() {
        let (_, store) = store();
        let first = store.create(new_job("local")).await.unwrap();
        let second = store.create(new_job("local")).await.unwrap();

        let jobs = store.list_all().await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, second.id);
        assert_eq!(jobs[1].id, first.id);
    }

    #[tokio::test]
    async fn test_update_merges_and_refreshes_timestamp() {
        let (_, store) = store();
        let job = store.create(new_job("local")).await.unwrap();

        let updated = store
            .update(job.id, JobUpdate::processing(35))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.lifecycle_state, LifecycleState::Processing);
        assert_eq!(updated.progress_percent, 35);
        assert!(updated.updated_at >= job.updated_at);
        assert_eq!(updated.created_at, job.created_at);
        assert_eq!(store.get(job.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_update_unknown_id_returns_none() {
        let (_, store) = store();
        store.create(new_job("local")).await.unwrap();

        let result = store
            .update(Uuid::new_v4(), JobUpdate::failed("boom"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_with_can_skip_write() {
        let (_, store) = store();
        let job = store.create(new_job("local")).await.unwrap();

        let unchanged = store.update_with(job.id, |_| None).await.unwrap().unwrap();
        assert_eq!(unchanged, job);
    }

    #[tokio::test]
    async fn test_remote_task_id_conflict_is_ignored() {
        let (_, store) = store();
        let job = store.create(new_job("local")).await.unwrap();

        store.update(job.id, JobUpdate::accepted("task-1")).await.unwrap();
        let job = store
            .update(job.id, JobUpdate::accepted("task-2"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(job.remote_task_id.as_deref(), Some("task-1"));
    }

    #[tokio::test]
    async fn test_delete_unknown_id_leaves_collection_unchanged() {
        let (_, store) = store();
        let job = store.create(new_job("local")).await.unwrap();

        assert!(!store.delete(Uuid::new_v4()).await.unwrap());
        assert_eq!(store.list_all().await.unwrap().len(), 1);

        assert!(store.delete(job.id).await.unwrap());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_owner_and_stats() {
        let (_, store) = store();
        let mine = store.create(new_job("alice")).await.unwrap();
        store.create(new_job("bob")).await.unwrap();

        store
            .update(
                mine.id,
                JobUpdate::completed(
                    100,
                    TrackResult {
                        audio_url: "https://cdn.example/a.mp3".to_string(),
                        cover_url: None,
                        duration_seconds: None,
                        clip_id: None,
                        video_url: None,
                    },
                ),
            )
            .await
            .unwrap();

        let alice = store.list_by_owner("alice").await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].id, mine.id);

        let stats = store.stats(Some("alice")).await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.completed, 1);

        let all = store.stats(None).await.unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.submitting, 1);
    }

    #[tokio::test]
    async fn test_corrupt_collection_reads_as_empty() {
        let (kv, store) = store();
        kv.put(JOBS_KEY, "{not json").await.unwrap();

        assert!(store.list_all().await.unwrap().is_empty());

        // The next write replaces the unreadable value
        store.create(new_job("local")).await.unwrap();
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let (_, store) = store();
        store.create(new_job("local")).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
