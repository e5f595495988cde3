//! Cadenza Provider Client
//!
//! A small, type-safe HTTP client for the third-party music generation provider.
//!
//! The client translates internal generation requests into the provider's wire
//! format, issues the HTTP calls, and normalizes the provider's heterogeneous
//! responses into the canonical types from `cadenza_core::dto::provider`.
//!
//! # Example
//!
//! ```no_run
//! use cadenza_client::{ProviderClient, build_generation_body};
//! use cadenza_core::domain::job::GenerationMode;
//! use cadenza_core::dto::job::SubmitParams;
//! use cadenza_core::dto::provider::DEFAULT_MODEL_VERSION;
//!
//! # async fn example() -> cadenza_client::Result<()> {
//! let client = ProviderClient::new("https://api.apicore.ai", "secret");
//!
//! let params = SubmitParams::new(GenerationMode::Inspiration, "calm piano at night");
//! let body = build_generation_body(&params, DEFAULT_MODEL_VERSION)?;
//! let task_id = client.submit_job(&body).await?;
//!
//! let status = client.get_job_status(&task_id).await?;
//! println!("{:?} {}%", status.status, status.progress_percent);
//! # Ok(())
//! # }
//! ```

pub mod error;
mod downloads;
mod request;
mod tasks;
mod wire;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use request::{BodyBuilder, build_generation_body};

use async_trait::async_trait;
use cadenza_core::dto::provider::{DownloadLink, GenerationBody, TaskStatus};
use reqwest::Client;
use serde_json::Value;

/// Operations the lifecycle manager needs from the provider
///
/// Implemented by [`ProviderClient`]; tests substitute scripted fakes.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Submits a generation request and returns the provider's task id
    async fn submit_job(&self, body: &GenerationBody) -> Result<String>;

    /// Queries the status of a submitted task
    async fn get_job_status(&self, task_id: &str) -> Result<TaskStatus>;

    /// Resolves the high-quality download link of a finished clip
    async fn get_download_link(&self, clip_id: &str) -> Result<DownloadLink>;
}

/// HTTP client for the generation provider
///
/// Endpoints are grouped by concern:
/// - Task submission and status
/// - Clip downloads
#[derive(Debug, Clone)]
pub struct ProviderClient {
    /// Base URL of the provider (e.g., "https://api.apicore.ai")
    base_url: String,
    /// Bearer token sent with every request
    api_key: String,
    /// HTTP client instance
    client: Client,
}

impl ProviderClient {
    /// Create a new provider client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the provider API
    /// * `api_key` - The provider API key
    ///
    /// # Example
    /// ```
    /// use cadenza_client::ProviderClient;
    ///
    /// let client = ProviderClient::new("https://api.apicore.ai", "secret");
    /// ```
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(base_url, api_key, Client::new())
    }

    /// Create a new provider client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use cadenza_client::ProviderClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = ProviderClient::with_client("https://api.apicore.ai", "secret", http_client);
    /// ```
    pub fn with_client(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Get the base URL of the provider
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Send an authorized request and parse the body as JSON
    ///
    /// Non-2xx statuses and bodies that are not JSON are reported as
    /// [`ClientError::ProviderRejected`]; transport failures as
    /// [`ClientError::Network`].
    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.bearer_auth(&self.api_key).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::rejected(status.as_u16(), error_text));
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ClientError::bad_payload(format!("Failed to parse JSON response: {}", e)))
    }
}

#[async_trait]
impl ProviderApi for ProviderClient {
    async fn submit_job(&self, body: &GenerationBody) -> Result<String> {
        ProviderClient::submit_job(self, body).await
    }

    async fn get_job_status(&self, task_id: &str) -> Result<TaskStatus> {
        ProviderClient::get_job_status(self, task_id).await
    }

    async fn get_download_link(&self, clip_id: &str) -> Result<DownloadLink> {
        ProviderClient::get_download_link(self, clip_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ProviderClient::new("https://api.apicore.ai", "key");
        assert_eq!(client.base_url(), "https://api.apicore.ai");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ProviderClient::new("https://api.apicore.ai/", "key");
        assert_eq!(client.base_url(), "https://api.apicore.ai");
    }

    #[test]
    fn test_client_with_custom_client() {
        let http_client = Client::new();
        let client = ProviderClient::with_client("http://localhost:9000", "key", http_client);
        assert_eq!(client.base_url(), "http://localhost:9000");
    }
}
