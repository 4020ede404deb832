//! In-process collaborators for orchestrator tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secretwatch_core::CredentialRecord;
use secretwatch_events::{EventSink, NotificationEvent, PublishError, SinkConnector};
use secretwatch_graph::{
    AuthError, CredentialSource, DirectoryError, DirectoryResult, DirectoryScan,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What the stub directory does when scanned.
pub enum ScanBehaviour {
    Records(Vec<CredentialRecord>),
    GraphFailure(u16),
    TokenFailure,
    Panic,
}

/// Directory stub.
pub struct StubSource {
    behaviour: ScanBehaviour,
    pub scans: AtomicUsize,
}

impl StubSource {
    pub fn new(behaviour: ScanBehaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            scans: AtomicUsize::new(0),
        })
    }

    pub fn with_records(records: Vec<CredentialRecord>) -> Arc<Self> {
        Self::new(ScanBehaviour::Records(records))
    }
}

#[async_trait]
impl CredentialSource for StubSource {
    async fn scan(&self) -> DirectoryResult<DirectoryScan> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            ScanBehaviour::Records(records) => Ok(DirectoryScan {
                records: records.clone(),
                applications_scanned: 1,
                pages_fetched: 1,
                skipped_credentials: 0,
            }),
            ScanBehaviour::GraphFailure(status) => Err(DirectoryError::GraphApi {
                status: *status,
                reason: "Service Unavailable".to_string(),
                code: "serviceNotAvailable".to_string(),
                message: "try later".to_string(),
            }),
            ScanBehaviour::TokenFailure => Err(DirectoryError::Auth(AuthError::Rejected {
                status: 401,
                body: "invalid_client".to_string(),
            })),
            ScanBehaviour::Panic => panic!("directory client blew up"),
        }
    }
}

/// Sink that records delivered events and fails chosen subjects.
#[derive(Default)]
pub struct RecordingSink {
    pub failing_subjects: HashSet<String>,
    pub delivered: Mutex<Vec<NotificationEvent>>,
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn send(&self, event: &NotificationEvent) -> Result<(), PublishError> {
        if self.failing_subjects.contains(&event.subject_path) {
            return Err(PublishError::Rejected {
                status: 500,
                body: "sink error".to_string(),
            });
        }
        self.delivered.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// How the stub connector fails.
#[derive(Debug, Clone, Copy)]
pub enum ConnectFailure {
    MissingKey,
    Timeout,
}

/// Connector handing out one shared sink, or failing to connect.
pub struct StubConnector {
    pub sink: Arc<RecordingSink>,
    pub failure: Option<ConnectFailure>,
    pub connects: AtomicUsize,
}

impl StubConnector {
    pub fn new(sink: RecordingSink) -> Arc<Self> {
        Arc::new(Self {
            sink: Arc::new(sink),
            failure: None,
            connects: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Self::failing_with(ConnectFailure::MissingKey)
    }

    pub fn failing_with(failure: ConnectFailure) -> Arc<Self> {
        Arc::new(Self {
            sink: Arc::new(RecordingSink::default()),
            failure: Some(failure),
            connects: AtomicUsize::new(0),
        })
    }

    pub fn delivered(&self) -> Vec<NotificationEvent> {
        self.sink.delivered.lock().unwrap().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SinkConnector for StubConnector {
    async fn connect(&self) -> Result<Arc<dyn EventSink>, PublishError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(ConnectFailure::MissingKey) => Err(PublishError::Credentials(
                "secret not found: endpointKey".to_string(),
            )),
            Some(ConnectFailure::Timeout) => {
                Err(PublishError::Timeout(std::time::Duration::from_secs(5)))
            }
            None => Ok(self.sink.clone()),
        }
    }
}

/// Record expiring `days` from now (negative for the past).
pub fn record_in_days(app: &str, key_id: &str, days: i64) -> CredentialRecord {
    CredentialRecord::new(app, key_id, Utc::now() + Duration::days(days))
}
