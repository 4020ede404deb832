//! Error types for building and publishing notification events.

use std::time::Duration;
use thiserror::Error;

/// Errors raised when a notification cannot be built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// Healthy credentials never produce a notification.
    #[error("credential '{credential_id}' is healthy; no notification is built")]
    HealthyCredential { credential_id: String },
}

/// Errors raised while connecting to or delivering to the event sink.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Sink endpoint or key could not be resolved.
    #[error("Sink credentials unavailable: {0}")]
    Credentials(String),

    /// Topic endpoint is not an absolute http(s) URL.
    #[error("Invalid sink endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Sink answered with a non-success status.
    #[error("Sink rejected event with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Event could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Delivery did not finish within the publish timeout.
    #[error("Publish timed out after {0:?}")]
    Timeout(Duration),
}

impl PublishError {
    /// Returns true for failures of the connect step rather than of one event.
    #[must_use]
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Self::Credentials(_) | Self::InvalidEndpoint { .. })
    }
}
