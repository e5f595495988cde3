//! Error types for the provider client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the generation provider
///
/// None of these are retried by the client; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request is unusable for the selected mode; raised before any network I/O
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Provider answered with an error status, an error code, or an unusable payload
    #[error("Provider rejected the request: {message}")]
    ProviderRejected {
        /// HTTP status code, when the rejection came from the status line
        status: Option<u16>,
        /// Error message from the provider or a description of the bad payload
        message: String,
    },

    /// Transport failure or timeout
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ClientError {
    /// Create a rejection from an HTTP status code and body
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::ProviderRejected {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create a rejection caused by the payload rather than the status line
    pub fn bad_payload(message: impl Into<String>) -> Self {
        Self::ProviderRejected {
            status: None,
            message: message.into(),
        }
    }

    /// Check if this error was raised before contacting the provider
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error came from the transport layer
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Check if the provider timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_timeout())
    }
}
