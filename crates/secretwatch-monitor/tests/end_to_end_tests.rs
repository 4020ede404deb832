//! Full pipeline against mocked Microsoft Graph and Event Grid endpoints.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use secretwatch_events::{EventGridConnector, EventPublisher};
use secretwatch_graph::{
    ClientCredentials, DirectoryScanner, GraphClient, GraphConfig, RetryPolicy, TokenCache,
};
use secretwatch_monitor::{ExpirationJob, RunState};
use secretwatch_secrets::{SecretError, SecretProvider, SecretValue};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TENANT: &str = "contoso-tenant";

struct StaticSecrets(HashMap<&'static str, String>);

#[async_trait]
impl SecretProvider for StaticSecrets {
    async fn get_secret(&self, name: &str) -> Result<SecretValue, SecretError> {
        self.0
            .get(name)
            .map(|v| SecretValue::new(name, v.clone().into_bytes()))
            .ok_or_else(|| SecretError::NotFound {
                name: name.to_string(),
            })
    }

    fn provider_type(&self) -> &'static str {
        "static"
    }
}

fn rfc3339_in_days(days: i64) -> String {
    (Utc::now() + ChronoDuration::days(days)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

async fn mock_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "graph-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

fn job_for(graph: &MockServer, topic: &MockServer) -> ExpirationJob {
    let config = GraphConfig {
        login_endpoint: Some(graph.uri()),
        graph_endpoint: Some(graph.uri()),
        retry: RetryPolicy::for_testing(),
        ..GraphConfig::default()
    };
    let credentials = ClientCredentials {
        tenant_id: TENANT.to_string(),
        client_id: "monitor-client".to_string(),
        client_secret: "monitor-secret".to_string().into(),
    };
    let tokens = Arc::new(TokenCache::new(credentials, &config).unwrap());
    let scanner = DirectoryScanner::new(GraphClient::new(tokens, config).unwrap());

    let secrets = StaticSecrets(HashMap::from([
        ("topicEndpoint", format!("{}/api/events", topic.uri())),
        ("endpointKey", "topic-key".to_string()),
    ]));
    let connector = EventGridConnector::new(
        Arc::new(secrets),
        "urn:secretwatch:appregistrations",
        Duration::from_secs(5),
    );

    ExpirationJob::new(Arc::new(scanner), Arc::new(connector))
        .with_publisher(EventPublisher::default())
}

#[tokio::test]
async fn test_contoso_scenario_end_to_end() {
    let graph = MockServer::start().await;
    let topic = MockServer::start().await;
    mock_token(&graph).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/applications"))
        .and(header("authorization", "Bearer graph-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": "obj-contoso",
                "appId": "app-contoso",
                "displayName": "Contoso App",
                "passwordCredentials": [
                    {"keyId": "A", "endDateTime": rfc3339_in_days(5)},
                    {"keyId": "B", "endDateTime": rfc3339_in_days(-1)}
                ]
            }]
        })))
        .expect(1)
        .mount(&graph)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/events"))
        .and(header("aeg-sas-key", "topic-key"))
        .and(body_partial_json(json!({
            "type": "ClientSecretAboutToExpire",
            "subject": "/appregistrations/clientsecrets/A",
            "data": {"displayName": "Contoso App", "keyId": "A"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&topic)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/events"))
        .and(header("aeg-sas-key", "topic-key"))
        .and(body_partial_json(json!({
            "type": "ClientSecretExpired",
            "subject": "/appregistrations/clientsecrets/B"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&topic)
        .await;

    let report = job_for(&graph, &topic).run().await;

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.applications_scanned, 1);
    assert_eq!(report.credentials_scanned, 2);
    assert_eq!(report.expiring_soon, 1);
    assert_eq!(report.expired, 1);
    assert_eq!(report.notifications_sent, 2);
    assert_eq!(report.publish_failures, 0);
}

#[tokio::test]
async fn test_application_without_credentials_publishes_nothing() {
    let graph = MockServer::start().await;
    let topic = MockServer::start().await;
    mock_token(&graph).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/applications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"displayName": "Lonely App", "passwordCredentials": []}]
        })))
        .mount(&graph)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&topic)
        .await;

    let report = job_for(&graph, &topic).run().await;

    assert_eq!(report.state, RunState::Completed);
    assert!(report.publish_skipped);
    assert_eq!(report.notifications_sent, 0);
}

#[tokio::test]
async fn test_graph_failure_publishes_nothing() {
    let graph = MockServer::start().await;
    let topic = MockServer::start().await;
    mock_token(&graph).await;

    Mock::given(method("GET"))
        .and(path("/v1.0/applications"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": "Authorization_RequestDenied",
                "message": "Insufficient privileges to complete the operation."
            }
        })))
        .mount(&graph)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&topic)
        .await;

    let report = job_for(&graph, &topic).run().await;

    assert_eq!(report.state, RunState::Failed);
    assert!(report
        .error
        .as_deref()
        .unwrap()
        .contains("Authorization_RequestDenied"));
}
