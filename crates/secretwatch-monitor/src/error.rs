//! Run-boundary error taxonomy.

use secretwatch_graph::DirectoryError;
use thiserror::Error;

/// Reasons a run ends in `Failed`.
///
/// Publish failures of individual events are not here; they are counted in
/// the run report.
#[derive(Debug, Error)]
pub enum RunError {
    /// Directory or sink credentials could not be obtained.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The directory scan failed; nothing was published.
    #[error("Directory scan failed: {0}")]
    Directory(DirectoryError),

    /// Anything else, including panics caught at the run boundary.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<DirectoryError> for RunError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Auth(auth) => Self::Auth(auth.to_string()),
            other => Self::Directory(other),
        }
    }
}

impl RunError {
    /// Short machine-friendly kind for structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Directory(_) => "directory",
            Self::Unexpected(_) => "unexpected",
        }
    }
}
