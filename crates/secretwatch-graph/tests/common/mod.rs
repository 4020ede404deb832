//! Common test utilities for secretwatch-graph integration tests.

#![allow(dead_code)]

use secretwatch_core::{DependencyObservation, DependencyTracker};
use secretwatch_graph::{
    ClientCredentials, DirectoryScanner, GraphClient, GraphConfig, RetryPolicy, TokenCache,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

pub const TEST_TENANT: &str = "tenant-test";

/// Test data factory for an application registration.
pub fn create_application(display_name: &str, credentials: Vec<Value>) -> Value {
    json!({
        "id": format!("obj-{}", display_name.to_lowercase().replace(' ', "-")),
        "appId": format!("app-{}", display_name.to_lowercase().replace(' ', "-")),
        "displayName": display_name,
        "passwordCredentials": credentials
    })
}

/// Test data factory for a password credential.
pub fn create_password_credential(key_id: &str, end_date_time: &str) -> Value {
    json!({
        "keyId": key_id,
        "endDateTime": end_date_time,
        "displayName": "generated"
    })
}

/// Wraps items in an OData response format.
pub fn create_odata_response(items: Vec<Value>, next_link: Option<&str>) -> Value {
    let mut response = json!({ "value": items });
    if let Some(link) = next_link {
        response["@odata.nextLink"] = json!(link);
    }
    response
}

/// Creates an OData error body.
pub fn create_odata_error(code: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message,
            "innerError": {"request-id": "test-request-id"}
        }
    })
}

/// Serves a fixed sequence of responses, repeating the last one.
pub struct SequenceResponder {
    responses: Vec<ResponseTemplate>,
    calls: Arc<AtomicUsize>,
}

impl SequenceResponder {
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        Self {
            responses,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        let idx = idx.min(self.responses.len() - 1);
        self.responses[idx].clone()
    }
}

/// Tracker that keeps every observation for assertions.
#[derive(Debug, Default)]
pub struct RecordingTracker {
    observations: Mutex<Vec<DependencyObservation>>,
}

impl RecordingTracker {
    pub fn observations(&self) -> Vec<DependencyObservation> {
        self.observations.lock().unwrap().clone()
    }
}

impl DependencyTracker for RecordingTracker {
    fn track(&self, observation: &DependencyObservation) {
        self.observations.lock().unwrap().push(observation.clone());
    }
}

/// Mock Microsoft Graph server serving both the token and Graph endpoints.
pub struct MockGraphServer {
    pub server: MockServer,
}

impl MockGraphServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Sets up a successful token endpoint expected to be called `times` times.
    pub async fn mock_token_endpoint(&self, times: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/{TEST_TENANT}/oauth2/v2.0/token")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "test-access-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Serves `pages` from `/v1.0/applications`, chaining them with nextLinks.
    pub async fn mock_application_pages(&self, pages: Vec<Vec<Value>>) {
        let count = pages.len();
        let bodies = pages
            .into_iter()
            .enumerate()
            .map(|(idx, items)| {
                let next = (idx + 1 < count).then(|| {
                    format!("{}/v1.0/applications?$skiptoken=page{}", self.uri(), idx + 1)
                });
                ResponseTemplate::new(200)
                    .set_body_json(create_odata_response(items, next.as_deref()))
            })
            .collect();

        Mock::given(method("GET"))
            .and(path("/v1.0/applications"))
            .respond_with(SequenceResponder::new(bodies))
            .expect(count as u64)
            .mount(&self.server)
            .await;
    }

    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            login_endpoint: Some(self.uri()),
            graph_endpoint: Some(self.uri()),
            retry: RetryPolicy::for_testing(),
            ..GraphConfig::default()
        }
    }

    /// Builds a scanner pointed at this server, recording into `tracker`.
    pub fn scanner(&self, config: GraphConfig, tracker: Arc<RecordingTracker>) -> DirectoryScanner {
        let credentials = ClientCredentials {
            tenant_id: TEST_TENANT.to_string(),
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string().into(),
        };
        let tokens = TokenCache::new(credentials, &config)
            .unwrap()
            .with_tracker(tracker.clone());
        let client = GraphClient::new(Arc::new(tokens), config)
            .unwrap()
            .with_tracker(tracker);
        DirectoryScanner::new(client)
    }
}
