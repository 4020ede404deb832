//! Batch delivery with per-event outcomes.

use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::{EventSink, NotificationEvent, PublishError};

/// Delivery tuning.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Maximum in-flight sink calls.
    pub concurrency: usize,
    /// Upper bound for a single delivery.
    pub timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout: Duration::from_secs(30),
        }
    }
}

/// An event the sink did not accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDelivery {
    pub event_id: String,
    pub subject: String,
    pub reason: String,
}

/// Outcome of publishing a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Ids of delivered events.
    pub succeeded: Vec<String>,
    /// Events that failed, with the reason.
    pub failed: Vec<FailedDelivery>,
}

impl PublishReport {
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.success_count() + self.failure_count()
    }
}

/// Delivers events to a connected sink.
#[derive(Debug, Clone, Default)]
pub struct EventPublisher {
    config: PublisherConfig,
}

impl EventPublisher {
    #[must_use]
    pub fn new(config: PublisherConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Attempts every event and returns once all attempts have finished.
    ///
    /// A failed or timed out delivery is recorded in the report and never
    /// stops the remaining events.
    #[instrument(skip(self, sink, events), fields(events = events.len()))]
    pub async fn publish(
        &self,
        sink: &dyn EventSink,
        events: &[NotificationEvent],
    ) -> PublishReport {
        let timeout = self.config.timeout;

        let deliveries: Vec<_> = events
            .iter()
            .enumerate()
            .map(|(idx, event)| async move {
                let outcome = match tokio::time::timeout(timeout, sink.send(event)).await {
                    Ok(result) => result,
                    Err(_) => Err(PublishError::Timeout(timeout)),
                };
                (idx, outcome)
            })
            .collect();
        let mut outcomes: Vec<(usize, Result<(), PublishError>)> = stream::iter(deliveries)
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;
        outcomes.sort_by_key(|(idx, _)| *idx);

        let mut report = PublishReport::default();
        for (idx, outcome) in outcomes {
            let event = &events[idx];
            match outcome {
                Ok(()) => {
                    debug!(
                        event_id = %event.event_id,
                        event_type = %event.event_type,
                        subject = %event.subject_path,
                        "Notification published"
                    );
                    report.succeeded.push(event.event_id.clone());
                }
                Err(e) => {
                    warn!(
                        event_id = %event.event_id,
                        event_type = %event.event_type,
                        subject = %event.subject_path,
                        error = %e,
                        "Notification delivery failed"
                    );
                    report.failed.push(FailedDelivery {
                        event_id: event.event_id.clone(),
                        subject: event.subject_path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            succeeded = report.success_count(),
            failed = report.failure_count(),
            "Publish batch finished"
        );

        report
    }
}
