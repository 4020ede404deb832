//! Error types for the directory scanner.

use thiserror::Error;

/// Result type alias using `DirectoryError`.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors raised while obtaining a directory access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token endpoint could not be reached.
    #[error("Token request failed: {0}")]
    Request(String),

    /// The token endpoint answered with a non-success status.
    #[error("Token request failed with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The token endpoint answered with an unreadable body.
    #[error("Failed to parse token response: {0}")]
    InvalidResponse(String),
}

/// Errors that abort a directory scan.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token acquisition failed.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Microsoft Graph returned a non-success status.
    #[error("Graph API error: {status} {reason} ({code}: {message})")]
    GraphApi {
        status: u16,
        reason: String,
        code: String,
        message: String,
    },

    /// Transport error, including timeouts.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Retries for throttling or transient failures were exhausted.
    #[error("Maximum retries ({attempts}) exceeded, last status {status}")]
    MaxRetriesExceeded { attempts: u32, status: u16 },

    /// Pagination did not make progress.
    #[error("Pagination error: {0}")]
    Pagination(String),
}

impl DirectoryError {
    /// HTTP status carried by the error, when there was a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::GraphApi { status, .. } | Self::MaxRetriesExceeded { status, .. } => {
                Some(*status)
            }
            Self::Auth(AuthError::Rejected { status, .. }) => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
