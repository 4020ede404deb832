//! Core types for application client secret expiry monitoring.
//!
//! This crate holds the pieces shared by every other secretwatch crate:
//!
//! - [`CredentialRecord`]: one client secret attached to one application registration
//! - [`ExpiryVerdict`]: the severity bucket a credential falls into
//! - [`ExpiryClassifier`] / [`classify`]: the pure mapping from expiry time to verdict
//! - [`DependencyObservation`] / [`DependencyTracker`]: timing records for outbound calls
//!
//! # Quick Start
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use secretwatch_core::{classify, ExpiryVerdict};
//!
//! let now = Utc::now();
//! assert_eq!(classify(now + Duration::days(5), now), ExpiryVerdict::ExpiringSoon);
//! assert_eq!(classify(now - Duration::days(1), now), ExpiryVerdict::Expired);
//! assert_eq!(classify(now + Duration::days(30), now), ExpiryVerdict::Healthy);
//! ```

/// Expiry classification.
pub mod classifier;

/// Outbound call telemetry.
pub mod telemetry;

/// Credential and verdict types.
pub mod types;

pub use classifier::{classify, remaining_days, ExpiryClassifier, DEFAULT_WARNING_WINDOW_DAYS};
pub use telemetry::{DependencyObservation, DependencyTracker, TracingDependencyTracker};
pub use types::{CredentialRecord, ExpiryVerdict};
