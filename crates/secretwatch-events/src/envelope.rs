//! CloudEvents 1.0 structured-mode envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{ClientSecretPayload, NotificationEvent};

/// `specversion` attribute value.
pub const SPEC_VERSION: &str = "1.0";

/// Content type of `data`.
pub const DATA_CONTENT_TYPE: &str = "application/json";

/// Default `source` attribute.
pub const DEFAULT_EVENT_SOURCE: &str = "urn:secretwatch:appregistrations";

/// Structured CloudEvent carrying a client secret notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudEvent {
    pub specversion: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub subject: String,
    pub id: String,
    pub time: DateTime<Utc>,
    pub datacontenttype: String,
    pub data: ClientSecretPayload,
}

impl CloudEvent {
    /// Wraps a notification for delivery from `source`.
    #[must_use]
    pub fn from_notification(event: &NotificationEvent, source: &str) -> Self {
        Self {
            specversion: SPEC_VERSION.to_string(),
            event_type: event.event_type.as_str().to_string(),
            source: source.to_string(),
            subject: event.subject_path.clone(),
            id: event.event_id.clone(),
            time: event.created_at,
            datacontenttype: DATA_CONTENT_TYPE.to_string(),
            data: event.payload.clone(),
        }
    }
}
