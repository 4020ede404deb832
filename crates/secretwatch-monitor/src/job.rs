//! Client secret expiration job.
//!
//! One run is one pass through scan, classify and publish:
//!
//! `Idle -> Scanning -> Classifying -> Publishing -> {Completed, Failed}`
//!
//! - A scan failure fails the run; nothing is published from a partial directory.
//! - Publishing is skipped when no credential needs a notification.
//! - Individual publish failures are counted but the run still completes.
//! - Panics inside a run are caught here and end the run as `Failed`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use secretwatch_core::{ExpiryClassifier, ExpiryVerdict};
use secretwatch_events::{build, EventPublisher, FailedDelivery, NotificationEvent, SinkConnector};
use secretwatch_graph::CredentialSource;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn, Span};
use uuid::Uuid;

use crate::RunError;

/// Position of a run in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Scanning,
    Classifying,
    Publishing,
    Completed,
    Failed,
}

impl RunState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Classifying => "classifying",
            Self::Publishing => "publishing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub applications_scanned: usize,
    /// Credential records produced by the scan.
    pub credentials_scanned: usize,
    /// Credentials the scanner could not normalize.
    pub skipped_credentials: usize,
    pub healthy: usize,
    pub expiring_soon: usize,
    pub expired: usize,
    pub notifications_sent: usize,
    pub publish_failures: usize,
    /// True when no credential needed a notification.
    pub publish_skipped: bool,
    #[serde(skip)]
    pub failed_deliveries: Vec<FailedDelivery>,
    pub error: Option<String>,
}

impl RunReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            state: RunState::Idle,
            started_at: Utc::now(),
            finished_at: None,
            applications_scanned: 0,
            credentials_scanned: 0,
            skipped_credentials: 0,
            healthy: 0,
            expiring_soon: 0,
            expired: 0,
            notifications_sent: 0,
            publish_failures: 0,
            publish_skipped: false,
            failed_deliveries: Vec::new(),
            error: None,
        }
    }

    /// Events that should have been sent this run.
    #[must_use]
    pub fn notifications_due(&self) -> usize {
        self.expiring_soon + self.expired
    }

    /// Returns true when the run completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }
}

/// Scans the directory, classifies every credential and publishes notifications.
pub struct ExpirationJob {
    source: Arc<dyn CredentialSource>,
    connector: Arc<dyn SinkConnector>,
    classifier: ExpiryClassifier,
    publisher: EventPublisher,
    state: watch::Sender<RunState>,
}

impl ExpirationJob {
    /// Create a new job with the default classifier and publisher settings.
    #[must_use]
    pub fn new(source: Arc<dyn CredentialSource>, connector: Arc<dyn SinkConnector>) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            source,
            connector,
            classifier: ExpiryClassifier::default(),
            publisher: EventPublisher::default(),
            state,
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: ExpiryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    #[must_use]
    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    /// State of the current or most recent run.
    #[must_use]
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Run a single pass. Never panics and never returns an error; the
    /// outcome is in the report.
    #[instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn run(&self) -> RunReport {
        let run_id = Uuid::new_v4();
        Span::current().record("run_id", tracing::field::display(run_id));

        let mut report = RunReport::new(run_id);
        self.transition(&mut report, RunState::Idle);
        info!("Starting client secret expiration run");

        let outcome = AssertUnwindSafe(self.execute(&mut report))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(RunError::Unexpected(panic_message(panic.as_ref()))));

        match outcome {
            Ok(()) => self.transition(&mut report, RunState::Completed),
            Err(e) => {
                error!(
                    error_kind = e.kind(),
                    error = %e,
                    state = %report.state,
                    "Expiration run aborted"
                );
                report.error = Some(e.to_string());
                self.transition(&mut report, RunState::Failed);
            }
        }
        report.finished_at = Some(Utc::now());

        log_summary(&report);
        report
    }

    async fn execute(&self, report: &mut RunReport) -> Result<(), RunError> {
        self.transition(report, RunState::Scanning);
        let scan = self.source.scan().await?;
        report.applications_scanned = scan.applications_scanned;
        report.credentials_scanned = scan.records.len();
        report.skipped_credentials = scan.skipped_credentials;

        self.transition(report, RunState::Classifying);
        let events = self.classify(&scan.records, Utc::now(), report)?;

        if events.is_empty() {
            report.publish_skipped = true;
            debug!("No expiring or expired client secrets, publishing skipped");
            return Ok(());
        }

        self.transition(report, RunState::Publishing);
        let sink = self.connector.connect().await.map_err(|e| {
            if e.is_credential_failure() {
                RunError::Auth(e.to_string())
            } else {
                RunError::Unexpected(format!("sink connection failed: {e}"))
            }
        })?;

        let published = self.publisher.publish(sink.as_ref(), &events).await;
        report.notifications_sent = published.success_count();
        report.publish_failures = published.failure_count();
        report.failed_deliveries = published.failed;

        Ok(())
    }

    /// Buckets every record and builds notifications for the non-healthy ones.
    fn classify(
        &self,
        records: &[secretwatch_core::CredentialRecord],
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) -> Result<Vec<NotificationEvent>, RunError> {
        let mut events = Vec::new();

        for record in records {
            let remaining_valid_days = record.remaining_valid_days(now);
            let verdict = self.classifier.classify_remaining(remaining_valid_days);

            if !verdict.requires_notification() {
                report.healthy += 1;
                continue;
            }

            if verdict == ExpiryVerdict::Expired {
                report.expired += 1;
                warn!(
                    key_id = %record.credential_id,
                    application_name = %record.application_name,
                    remaining_valid_days,
                    "{} has a client secret that has expired",
                    record.application_name
                );
            } else {
                report.expiring_soon += 1;
                warn!(
                    key_id = %record.credential_id,
                    application_name = %record.application_name,
                    remaining_valid_days,
                    "{} has a client secret that will expire in {:.1} days",
                    record.application_name,
                    remaining_valid_days
                );
            }

            let event = build(record, verdict).map_err(|e| RunError::Unexpected(e.to_string()))?;
            events.push(event);
        }

        Ok(events)
    }

    fn transition(&self, report: &mut RunReport, next: RunState) {
        debug!(from = %report.state, to = %next, "Run state transition");
        report.state = next;
        self.state.send_replace(next);
    }
}

impl std::fmt::Debug for ExpirationJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirationJob")
            .field("classifier", &self.classifier)
            .field("publisher", &self.publisher)
            .field("state", &self.state())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic with non-string payload".to_string()
    }
}

fn log_summary(report: &RunReport) {
    let duration_ms = report
        .finished_at
        .map(|f| (f - report.started_at).num_milliseconds())
        .unwrap_or_default();

    match report.state {
        RunState::Failed => error!(
            run_id = %report.run_id,
            outcome = %report.state,
            duration_ms,
            applications_scanned = report.applications_scanned,
            credentials_scanned = report.credentials_scanned,
            notifications_sent = report.notifications_sent,
            publish_failures = report.publish_failures,
            error = report.error.as_deref().unwrap_or_default(),
            "Client secret expiration run failed"
        ),
        _ if report.publish_failures > 0 => warn!(
            run_id = %report.run_id,
            outcome = %report.state,
            duration_ms,
            applications_scanned = report.applications_scanned,
            credentials_scanned = report.credentials_scanned,
            notifications_due = report.notifications_due(),
            notifications_sent = report.notifications_sent,
            publish_failures = report.publish_failures,
            "Client secret expiration run completed with publish failures"
        ),
        _ => info!(
            run_id = %report.run_id,
            outcome = %report.state,
            duration_ms,
            applications_scanned = report.applications_scanned,
            credentials_scanned = report.credentials_scanned,
            skipped_credentials = report.skipped_credentials,
            healthy = report.healthy,
            expiring_soon = report.expiring_soon,
            expired = report.expired,
            notifications_due = report.notifications_due(),
            notifications_sent = report.notifications_sent,
            publish_failures = report.publish_failures,
            publish_skipped = report.publish_skipped,
            "Client secret expiration run completed"
        ),
    }
}
