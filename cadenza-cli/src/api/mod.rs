//! API client module
//!
//! HTTP client for communicating with the Cadenza server API.

use anyhow::{Context, Result};
use cadenza_core::domain::job::{Job, JobStats};
use cadenza_core::domain::profile::UserProfile;
use cadenza_core::dto::job::{PollerHealth, SubmitAccepted, SubmitParams};
use cadenza_core::dto::profile::UpsertProfile;
use cadenza_core::dto::provider::DownloadLink;
use reqwest::Client;
use uuid::Uuid;

/// HTTP client for the Cadenza server API
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the server API
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    // =============================================================================
    // Jobs
    // =============================================================================

    /// Submit a new generation job
    ///
    /// # Arguments
    /// * `req` - The submission parameters
    ///
    /// # Returns
    /// The local id of the recorded job
    pub async fn submit_job(&self, req: &SubmitParams) -> Result<Uuid> {
        let url = format!("{}/api/jobs", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await
            .context("Failed to send submit job request")?;

        let accepted: SubmitAccepted = self.handle_response(response).await?;
        Ok(accepted.id)
    }

    /// List jobs, optionally for a single owner
    pub async fn list_jobs(&self, owner_id: Option<&str>) -> Result<Vec<Job>> {
        let url = format!("{}/api/jobs", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(owner_id) = owner_id {
            request = request.query(&[("owner_id", owner_id)]);
        }

        let response = request
            .send()
            .await
            .context("Failed to send list jobs request")?;

        self.handle_response(response).await
    }

    /// Per-state job counts
    pub async fn job_stats(&self, owner_id: Option<&str>) -> Result<JobStats> {
        let url = format!("{}/api/jobs/stats", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(owner_id) = owner_id {
            request = request.query(&[("owner_id", owner_id)]);
        }

        let response = request
            .send()
            .await
            .context("Failed to send job stats request")?;

        self.handle_response(response).await
    }

    /// Get a job by ID
    ///
    /// # Arguments
    /// * `id` - The job UUID
    pub async fn get_job(&self, id: Uuid) -> Result<Job> {
        let url = format!("{}/api/jobs/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get job request")?;

        self.handle_response(response).await
    }

    /// Delete a job and stop its polling
    ///
    /// # Arguments
    /// * `id` - The job UUID to delete
    pub async fn delete_job(&self, id: Uuid) -> Result<()> {
        let url = format!("{}/api/jobs/{}", self.base_url, id);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .context("Failed to send delete job request")?;

        self.handle_empty_response(response).await
    }

    /// Ask the server to check the provider once for this job
    pub async fn refresh_job(&self, id: Uuid) -> Result<Job> {
        let url = format!("{}/api/jobs/{}/refresh", self.base_url, id);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("Failed to send refresh job request")?;

        self.handle_response(response).await
    }

    /// Resolve the WAV download link of a completed job
    pub async fn download_link(&self, id: Uuid) -> Result<DownloadLink> {
        let url = format!("{}/api/jobs/{}/download", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send download request")?;

        self.handle_response(response).await
    }

    /// Fetch a file from an absolute URL
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Download failed with status {}", response.status());
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read download body")?;
        Ok(bytes.to_vec())
    }

    // =============================================================================
    // Profile & Data
    // =============================================================================

    pub async fn get_profile(&self) -> Result<Option<UserProfile>> {
        let url = format!("{}/api/profile", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get profile request")?;

        self.handle_response(response).await
    }

    pub async fn update_profile(&self, req: &UpsertProfile) -> Result<UserProfile> {
        let url = format!("{}/api/profile", self.base_url);
        let response = self
            .client
            .put(&url)
            .json(req)
            .send()
            .await
            .context("Failed to send update profile request")?;

        self.handle_response(response).await
    }

    /// Remove every job and the profile
    pub async fn clear_data(&self) -> Result<()> {
        let url = format!("{}/api/data", self.base_url);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .context("Failed to send clear data request")?;

        self.handle_empty_response(response).await
    }

    pub async fn poller_health(&self) -> Result<PollerHealth> {
        let url = format!("{}/health/poller", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send poller health request")?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Request failed with status {}: {}", status, error_message(&error_text));
        }

        response
            .json()
            .await
            .context("Failed to parse response JSON")
    }

    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Request failed with status {}: {}", status, error_message(&error_text));
        }

        Ok(())
    }
}

/// Pulls the message out of a `{"error": ...}` body, or returns the body as is
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
