//! Expiry classification.
//!
//! Maps the remaining validity of a credential to an [`ExpiryVerdict`]:
//!
//! | Remaining (fractional days) | Verdict |
//! |-----------------------------|---------|
//! | `<= 0` | `Expired` |
//! | `0 < r <= window` | `ExpiringSoon` |
//! | `> window` | `Healthy` |
//!
//! The default window is 14 days. Remaining time is computed in nanoseconds and
//! converted to fractional days, so boundaries are never truncated to whole days.
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use secretwatch_core::{ExpiryClassifier, ExpiryVerdict};
//!
//! let now = Utc::now();
//! let classifier = ExpiryClassifier::default();
//!
//! // Exactly on the upper bound is still inside the window
//! assert_eq!(
//!     classifier.classify(now + Duration::days(14), now),
//!     ExpiryVerdict::ExpiringSoon
//! );
//!
//! // Zero remaining is expired
//! assert_eq!(classifier.classify(now, now), ExpiryVerdict::Expired);
//! ```

use chrono::{DateTime, Utc};

use crate::types::ExpiryVerdict;

/// Default upper bound of the `ExpiringSoon` window, in days.
pub const DEFAULT_WARNING_WINDOW_DAYS: f64 = 14.0;

const NANOS_PER_DAY: f64 = 86_400_000_000_000.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Fractional days between `now` and `expires_at`. Negative when in the past.
#[must_use]
pub fn remaining_days(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let remaining = expires_at.signed_duration_since(now);
    // Nanosecond precision overflows past roughly 292 years
    match remaining.num_nanoseconds() {
        Some(nanos) => nanos as f64 / NANOS_PER_DAY,
        None => remaining.num_milliseconds() as f64 / MILLIS_PER_DAY,
    }
}

/// Classifies with the default 14 day window.
#[must_use]
pub fn classify(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> ExpiryVerdict {
    ExpiryClassifier::default().classify(expires_at, now)
}

/// Pure classifier with a configurable warning window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpiryClassifier {
    warning_window_days: f64,
}

impl Default for ExpiryClassifier {
    fn default() -> Self {
        Self {
            warning_window_days: DEFAULT_WARNING_WINDOW_DAYS,
        }
    }
}

impl ExpiryClassifier {
    /// Creates a classifier with a custom window.
    ///
    /// Returns `None` unless `warning_window_days` is finite and positive.
    #[must_use]
    pub fn with_warning_window(warning_window_days: f64) -> Option<Self> {
        if warning_window_days.is_finite() && warning_window_days > 0.0 {
            Some(Self {
                warning_window_days,
            })
        } else {
            None
        }
    }

    /// Returns the window upper bound in days.
    #[must_use]
    pub const fn warning_window_days(&self) -> f64 {
        self.warning_window_days
    }

    /// Classifies a credential expiring at `expires_at`, evaluated at `now`.
    #[must_use]
    pub fn classify(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> ExpiryVerdict {
        self.classify_remaining(remaining_days(expires_at, now))
    }

    /// Classifies an already computed remaining duration in fractional days.
    #[must_use]
    pub fn classify_remaining(&self, remaining_days: f64) -> ExpiryVerdict {
        if remaining_days <= 0.0 {
            ExpiryVerdict::Expired
        } else if remaining_days <= self.warning_window_days {
            ExpiryVerdict::ExpiringSoon
        } else {
            ExpiryVerdict::Healthy
        }
    }
}
