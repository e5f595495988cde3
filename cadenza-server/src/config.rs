//! Server configuration
//!
//! Defines the provider connection, storage location, bind address and the
//! timing of the status polling loops.

use cadenza_core::dto::provider::DEFAULT_MODEL_VERSION;
use std::time::Duration;

use crate::scheduler::PollSettings;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider base URL (e.g., "https://api.apicore.ai")
    pub provider_url: String,

    /// Bearer token for the provider
    pub provider_api_key: String,

    /// Timeout of every provider HTTP call
    pub provider_timeout: Duration,

    /// Model version tag sent with custom and continuation requests
    pub model_version: String,

    /// SQLite connection string
    pub database_url: String,

    /// Address the HTTP API listens on
    pub bind_addr: String,

    /// Wait before the first status check of a job
    pub poll_initial_delay: Duration,

    /// Wait between status checks while a job is in progress
    pub poll_interval: Duration,

    /// Wait after a failed status check
    pub poll_retry_interval: Duration,

    /// Status checks allowed per job before it times out
    pub poll_max_attempts: u32,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(provider_api_key: String) -> Self {
        let poll = PollSettings::default();
        Self {
            provider_url: "https://api.apicore.ai".to_string(),
            provider_api_key,
            provider_timeout: Duration::from_secs(30),
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            database_url: "sqlite://cadenza.db?mode=rwc".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            poll_initial_delay: poll.initial_delay,
            poll_interval: poll.pending_interval,
            poll_retry_interval: poll.retry_interval,
            poll_max_attempts: poll.max_attempts,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - PROVIDER_API_KEY (required)
    /// - PROVIDER_URL (optional, default: https://api.apicore.ai)
    /// - PROVIDER_TIMEOUT (optional, seconds, default: 30)
    /// - MODEL_VERSION (optional, default: chirp-v3-0)
    /// - DATABASE_URL (optional, default: sqlite://cadenza.db?mode=rwc)
    /// - BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - POLL_INITIAL_DELAY (optional, seconds, default: 5)
    /// - POLL_INTERVAL (optional, seconds, default: 5)
    /// - POLL_RETRY_INTERVAL (optional, seconds, default: 15)
    /// - POLL_MAX_ATTEMPTS (optional, default: 60)
    pub fn from_env() -> anyhow::Result<Self> {
        let provider_api_key = std::env::var("PROVIDER_API_KEY")
            .map_err(|_| anyhow::anyhow!("PROVIDER_API_KEY environment variable not set"))?;

        let defaults = Self::new(provider_api_key);

        Ok(Self {
            provider_url: env_string("PROVIDER_URL").unwrap_or(defaults.provider_url),
            provider_timeout: env_secs("PROVIDER_TIMEOUT").unwrap_or(defaults.provider_timeout),
            model_version: env_string("MODEL_VERSION").unwrap_or(defaults.model_version),
            database_url: env_string("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: env_string("BIND_ADDR").unwrap_or(defaults.bind_addr),
            poll_initial_delay: env_secs("POLL_INITIAL_DELAY")
                .unwrap_or(defaults.poll_initial_delay),
            poll_interval: env_secs("POLL_INTERVAL").unwrap_or(defaults.poll_interval),
            poll_retry_interval: env_secs("POLL_RETRY_INTERVAL")
                .unwrap_or(defaults.poll_retry_interval),
            poll_max_attempts: std::env::var("POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(defaults.poll_max_attempts),
            provider_api_key: defaults.provider_api_key,
        })
    }

    /// Timing of the polling loops
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            initial_delay: self.poll_initial_delay,
            pending_interval: self.poll_interval,
            retry_interval: self.poll_retry_interval,
            max_attempts: self.poll_max_attempts,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.provider_url.is_empty() {
            anyhow::bail!("provider_url cannot be empty");
        }

        if !self.provider_url.starts_with("http://") && !self.provider_url.starts_with("https://")
        {
            anyhow::bail!("provider_url must start with http:// or https://");
        }

        if self.model_version.is_empty() {
            anyhow::bail!("model_version cannot be empty");
        }

        if !self.database_url.starts_with("sqlite:") {
            anyhow::bail!("database_url must be a sqlite: connection string");
        }

        if self.provider_timeout.is_zero() {
            anyhow::bail!("provider_timeout must be greater than 0");
        }

        if self.poll_interval.is_zero() || self.poll_retry_interval.is_zero() {
            anyhow::bail!("poll intervals must be greater than 0");
        }

        if self.poll_max_attempts == 0 {
            anyhow::bail!("poll_max_attempts must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(String::new())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider_url, "https://api.apicore.ai");
        assert_eq!(config.model_version, "chirp-v3-0");
        assert_eq!(config.poll_settings(), PollSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::new("key".to_string());
        assert!(config.validate().is_ok());

        config.provider_url = "api.apicore.ai".to_string();
        assert!(config.validate().is_err());
        config.provider_url = "http://localhost:9000".to_string();

        config.poll_max_attempts = 0;
        assert!(config.validate().is_err());
        config.poll_max_attempts = 60;

        config.database_url = "postgres://localhost/cadenza".to_string();
        assert!(config.validate().is_err());
    }
}
