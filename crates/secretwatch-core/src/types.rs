//! Credential and verdict types.
//!
//! A [`CredentialRecord`] is built fresh from directory output on every run and
//! is never mutated afterwards. An [`ExpiryVerdict`] is derived from it by the
//! classifier; only non-healthy verdicts produce notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classifier::remaining_days;

/// One password credential (client secret) attached to one application registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Display name of the owning application. Not unique.
    pub application_name: String,

    /// Directory application (client) id, when the directory returned one.
    pub application_id: Option<String>,

    /// Directory-assigned credential key id.
    ///
    /// The directory guarantees these are globally unique, so this alone is the
    /// identity used for event subjects.
    pub credential_id: String,

    /// Expiration timestamp (UTC).
    pub expires_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Creates a record without an application id.
    pub fn new(
        application_name: impl Into<String>,
        credential_id: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            application_name: application_name.into(),
            application_id: None,
            credential_id: credential_id.into(),
            expires_at,
        }
    }

    /// Attaches the directory application id.
    #[must_use]
    pub fn with_application_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = Some(application_id.into());
        self
    }

    /// Fractional days of validity left at `now`. Negative once expired.
    #[must_use]
    pub fn remaining_valid_days(&self, now: DateTime<Utc>) -> f64 {
        remaining_days(self.expires_at, now)
    }
}

/// Severity bucket for a credential.
///
/// Serializes to `snake_case`:
///
/// ```rust
/// use secretwatch_core::ExpiryVerdict;
///
/// let json = serde_json::to_string(&ExpiryVerdict::ExpiringSoon).unwrap();
/// assert_eq!(json, "\"expiring_soon\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryVerdict {
    /// More than the warning window left. No notification.
    Healthy,
    /// Inside the warning window but not yet expired.
    ExpiringSoon,
    /// No validity left.
    Expired,
}

impl ExpiryVerdict {
    /// Returns true for verdicts that must produce a notification.
    #[must_use]
    pub const fn requires_notification(&self) -> bool {
        matches!(self, Self::ExpiringSoon | Self::Expired)
    }

    /// Returns the `snake_case` name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::ExpiringSoon => "expiring_soon",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for ExpiryVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
