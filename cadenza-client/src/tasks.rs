//! Task submission and status endpoints

use cadenza_core::dto::provider::{GenerationBody, TaskStatus};
use tracing::debug;

use crate::ProviderClient;
use crate::error::Result;
use crate::wire;

impl ProviderClient {
    // =============================================================================
    // Task Endpoints
    // =============================================================================

    /// Submit a generation request
    ///
    /// # Arguments
    /// * `body` - The request body produced by [`crate::BodyBuilder`]
    ///
    /// # Returns
    /// The provider's task id
    pub async fn submit_job(&self, body: &GenerationBody) -> Result<String> {
        let url = format!("{}/suno/submit/music", self.base_url);
        let value = self.send_json(self.client.post(&url).json(body)).await?;
        let task_id = wire::parse_submit_response(value)?;

        debug!("Provider accepted submission as task {}", task_id);
        Ok(task_id)
    }

    /// Get the status of a submitted task
    ///
    /// # Arguments
    /// * `task_id` - The provider task id returned by [`ProviderClient::submit_job`]
    pub async fn get_job_status(&self, task_id: &str) -> Result<TaskStatus> {
        let url = format!("{}/suno/fetch/{}", self.base_url, task_id);
        let value = self.send_json(self.client.get(&url)).await?;
        wire::parse_status_response(task_id, value)
    }
}
