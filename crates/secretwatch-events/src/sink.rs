//! Event sinks and the Azure Event Grid implementation.

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use secretwatch_core::{DependencyObservation, DependencyTracker, TracingDependencyTracker};
use secretwatch_secrets::SecretProvider;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::envelope::CloudEvent;
use crate::{NotificationEvent, PublishError};

/// Logical secret name of the topic endpoint.
pub const TOPIC_ENDPOINT_SECRET: &str = "topicEndpoint";

/// Logical secret name of the topic access key.
pub const ENDPOINT_KEY_SECRET: &str = "endpointKey";

const CLOUDEVENTS_CONTENT_TYPE: &str = "application/cloudevents+json; charset=utf-8";

/// Longest response body kept in a rejection error.
const MAX_ERROR_BODY_CHARS: usize = 1024;

/// Accepts one event per call.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers a single event.
    async fn send(&self, event: &NotificationEvent) -> Result<(), PublishError>;
}

/// Resolves sink credentials and opens a sink for one run.
#[async_trait]
pub trait SinkConnector: Send + Sync {
    /// Called at most once per run, and only when there is something to publish.
    async fn connect(&self) -> Result<Arc<dyn EventSink>, PublishError>;
}

/// Event Grid topic sink using SAS key authentication.
#[derive(Debug)]
pub struct EventGridSink {
    http_client: reqwest::Client,
    endpoint: Url,
    key: SecretString,
    source: String,
    tracker: Arc<dyn DependencyTracker>,
}

impl EventGridSink {
    /// Creates a sink for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::InvalidEndpoint`] unless `endpoint` is an
    /// absolute http(s) URL, or an HTTP error if the client cannot be built.
    pub fn new(
        endpoint: &str,
        key: SecretString,
        source: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PublishError> {
        let endpoint = parse_endpoint(endpoint)?;
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            endpoint,
            key,
            source: source.into(),
            tracker: Arc::new(TracingDependencyTracker),
        })
    }

    /// Replaces the dependency tracker.
    #[must_use]
    pub fn with_tracker(mut self, tracker: Arc<dyn DependencyTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Topic endpoint events are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, PublishError> {
    let invalid = |reason: String| PublishError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = Url::parse(endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

#[async_trait]
impl EventSink for EventGridSink {
    async fn send(&self, event: &NotificationEvent) -> Result<(), PublishError> {
        let body = serde_json::to_vec(&CloudEvent::from_notification(event, &self.source))?;

        let started_at = Utc::now();
        let start = Instant::now();
        let result = self
            .http_client
            .post(self.endpoint.clone())
            .header("aeg-sas-key", self.key.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, CLOUDEVENTS_CONTENT_TYPE)
            .body(body)
            .send()
            .await;
        self.tracker.track(&DependencyObservation::http(
            "POST",
            self.endpoint.as_str(),
            result.as_ref().ok().map(|r| r.status().as_u16()),
            started_at,
            start.elapsed(),
        ));

        let response = result?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        Err(PublishError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Connects to Event Grid using `topicEndpoint` and `endpointKey` from the secret store.
pub struct EventGridConnector {
    secrets: Arc<dyn SecretProvider>,
    source: String,
    timeout: Duration,
    tracker: Arc<dyn DependencyTracker>,
}

impl EventGridConnector {
    /// Creates a connector; nothing is resolved until [`SinkConnector::connect`].
    pub fn new(
        secrets: Arc<dyn SecretProvider>,
        source: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            secrets,
            source: source.into(),
            timeout,
            tracker: Arc::new(TracingDependencyTracker),
        }
    }

    /// Replaces the dependency tracker handed to connected sinks.
    #[must_use]
    pub fn with_tracker(mut self, tracker: Arc<dyn DependencyTracker>) -> Self {
        self.tracker = tracker;
        self
    }
}

impl std::fmt::Debug for EventGridConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventGridConnector")
            .field("provider_type", &self.secrets.provider_type())
            .field("source", &self.source)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl SinkConnector for EventGridConnector {
    async fn connect(&self) -> Result<Arc<dyn EventSink>, PublishError> {
        let endpoint = self
            .secrets
            .get_secret(TOPIC_ENDPOINT_SECRET)
            .await
            .map_err(|e| PublishError::Credentials(e.to_string()))?;
        let key = self
            .secrets
            .get_secret(ENDPOINT_KEY_SECRET)
            .await
            .and_then(|v| v.to_secret_string())
            .map_err(|e| PublishError::Credentials(e.to_string()))?;
        let endpoint = endpoint
            .as_str()
            .map_err(|e| PublishError::Credentials(e.to_string()))?;

        let sink = EventGridSink::new(endpoint, key, self.source.clone(), self.timeout)?
            .with_tracker(self.tracker.clone());

        tracing::debug!(
            endpoint = %sink.endpoint(),
            provider = self.secrets.provider_type(),
            "Event Grid sink connected"
        );

        Ok(Arc::new(sink))
    }
}
