//! Dependency timing records for outbound calls.
//!
//! Every HTTP call to the directory or to the event sink produces exactly one
//! [`DependencyObservation`], handed to a [`DependencyTracker`]. Tracking is
//! fire-and-forget: trackers cannot fail the call they observe.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Timing and outcome of one outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyObservation {
    /// Kind of dependency (always `HTTP` today).
    pub dependency_type: &'static str,
    /// Host the call went to.
    pub target: String,
    /// Method and path, without query string (e.g. `GET /v1.0/applications`).
    pub operation: String,
    /// Response status, `None` when no response arrived.
    pub status: Option<u16>,
    /// When the call started.
    pub started_at: DateTime<Utc>,
    /// How long the call took.
    pub duration: Duration,
    /// Whether the call returned a 2xx status.
    pub success: bool,
}

impl DependencyObservation {
    /// Builds an HTTP observation. The query string is dropped from the operation
    /// so continuation tokens never reach the telemetry sink.
    #[must_use]
    pub fn http(
        method: &str,
        url: &str,
        status: Option<u16>,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        let (target, path) = match url::Url::parse(url) {
            Ok(parsed) => (
                parsed.host_str().unwrap_or_default().to_string(),
                parsed.path().to_string(),
            ),
            Err(_) => (String::new(), url.split('?').next().unwrap_or_default().to_string()),
        };

        Self {
            dependency_type: "HTTP",
            target,
            operation: format!("{method} {path}"),
            status,
            started_at,
            duration,
            success: status.is_some_and(|s| (200..300).contains(&s)),
        }
    }
}

/// Receiver of dependency observations.
pub trait DependencyTracker: Send + Sync + fmt::Debug {
    /// Records one observation.
    fn track(&self, observation: &DependencyObservation);
}

/// Tracker that writes observations as `tracing` events on `secretwatch::dependency`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDependencyTracker;

impl DependencyTracker for TracingDependencyTracker {
    fn track(&self, observation: &DependencyObservation) {
        tracing::info!(
            target: "secretwatch::dependency",
            dependency_type = observation.dependency_type,
            dependency_target = %observation.target,
            operation = %observation.operation,
            status = ?observation.status,
            started_at = %observation.started_at.to_rfc3339(),
            duration_ms = observation.duration.as_millis() as u64,
            success = observation.success,
            "Dependency call tracked"
        );
    }
}
