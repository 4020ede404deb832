//! Notification event model and builder.

use chrono::{DateTime, Utc};
use secretwatch_core::{CredentialRecord, ExpiryVerdict};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::BuildError;

/// Kind of notification emitted for a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationEventType {
    /// Credential is inside the warning window.
    ClientSecretAboutToExpire,
    /// Credential is past its end date.
    ClientSecretExpired,
}

impl NotificationEventType {
    /// Event type for a verdict, `None` for healthy credentials.
    #[must_use]
    pub const fn for_verdict(verdict: ExpiryVerdict) -> Option<Self> {
        match verdict {
            ExpiryVerdict::Healthy => None,
            ExpiryVerdict::ExpiringSoon => Some(Self::ClientSecretAboutToExpire),
            ExpiryVerdict::Expired => Some(Self::ClientSecretExpired),
        }
    }

    /// Wire name used as the CloudEvents `type`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClientSecretAboutToExpire => "ClientSecretAboutToExpire",
            Self::ClientSecretExpired => "ClientSecretExpired",
        }
    }
}

impl fmt::Display for NotificationEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event payload. Field names follow the consumer-facing data contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSecretPayload {
    #[serde(rename = "displayName")]
    pub application_name: String,
    #[serde(rename = "keyId")]
    pub credential_id: String,
    #[serde(rename = "endDateTime")]
    pub expires_at: DateTime<Utc>,
}

/// One outbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub event_type: NotificationEventType,
    /// `/appregistrations/clientsecrets/{credential_id}`.
    pub subject_path: String,
    /// Fresh per build; never reused across builds or runs.
    pub event_id: String,
    pub created_at: DateTime<Utc>,
    pub payload: ClientSecretPayload,
}

/// Subject path for a credential.
#[must_use]
pub fn subject_path(credential_id: &str) -> String {
    format!("/appregistrations/clientsecrets/{credential_id}")
}

/// Builds the notification for a non-healthy credential.
///
/// # Errors
///
/// Returns [`BuildError::HealthyCredential`] for [`ExpiryVerdict::Healthy`].
pub fn build(
    record: &CredentialRecord,
    verdict: ExpiryVerdict,
) -> Result<NotificationEvent, BuildError> {
    let event_type =
        NotificationEventType::for_verdict(verdict).ok_or_else(|| BuildError::HealthyCredential {
            credential_id: record.credential_id.clone(),
        })?;

    Ok(NotificationEvent {
        event_type,
        subject_path: subject_path(&record.credential_id),
        event_id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        payload: ClientSecretPayload {
            application_name: record.application_name.clone(),
            credential_id: record.credential_id.clone(),
            expires_at: record.expires_at,
        },
    })
}
