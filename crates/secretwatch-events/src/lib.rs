//! Notification events for expiring client secrets.
//!
//! - [`build`] turns a classified [`CredentialRecord`](secretwatch_core::CredentialRecord)
//!   into a [`NotificationEvent`]
//! - [`CloudEvent`] is the structured CloudEvents 1.0 wire form
//! - [`EventGridConnector`] resolves sink credentials and yields an [`EventSink`]
//! - [`EventPublisher`] delivers a batch with bounded concurrency and reports
//!   every event's outcome

pub mod envelope;
pub mod error;
pub mod event;
pub mod publisher;
pub mod sink;

pub use envelope::{CloudEvent, DEFAULT_EVENT_SOURCE};
pub use error::{BuildError, PublishError};
pub use event::{
    build, subject_path, ClientSecretPayload, NotificationEvent, NotificationEventType,
};
pub use publisher::{EventPublisher, FailedDelivery, PublishReport, PublisherConfig};
pub use sink::{
    EventGridConnector, EventGridSink, EventSink, SinkConnector, ENDPOINT_KEY_SECRET,
    TOPIC_ENDPOINT_SECRET,
};
