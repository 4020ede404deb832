//! Client secret expiry monitoring.
//!
//! Wires the directory scanner, the classifier and the event publisher into
//! an [`ExpirationJob`], and runs it on a [`Scheduler`].

pub mod config;
pub mod error;
pub mod job;
pub mod scheduler;

pub use config::{resolve_client_credentials, ConfigError, LogFormat, MonitorConfig};
pub use error::RunError;
pub use job::{ExpirationJob, RunReport, RunState};
pub use scheduler::Scheduler;
