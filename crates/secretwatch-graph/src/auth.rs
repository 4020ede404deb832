//! Client-credentials tokens for Graph.
//!
//! A token is reused until it is within the refresh margin of its expiry. The
//! refresh itself happens under the write lock, so concurrent callers wait for
//! one token request instead of each issuing their own.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use secretwatch_core::{DependencyObservation, DependencyTracker, TracingDependencyTracker};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::{AuthError, ClientCredentials, DirectoryResult, GraphConfig};

/// Refresh this long before the token expires.
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// Source of bearer tokens for directory requests.
#[async_trait]
pub trait TokenSupplier: Send + Sync + std::fmt::Debug {
    async fn access_token(&self) -> Result<String, AuthError>;

    /// Forget any cached token. Called after the directory rejects one.
    async fn invalidate(&self) {}
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    expires_in: i64,
}

impl TokenGrant {
    fn into_issued(self, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        if self.expires_in <= 0 {
            return Err(AuthError::InvalidResponse(format!(
                "expires_in must be positive, got {}",
                self.expires_in
            )));
        }
        let expires_at = Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::InvalidResponse(format!("expires_in out of range: {}", self.expires_in))
            })?;

        Ok(IssuedToken {
            value: self.access_token,
            expires_at,
        })
    }
}

#[derive(Debug, Clone)]
struct IssuedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl IssuedToken {
    fn usable_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin < self.expires_at
    }
}

/// [`TokenSupplier`] backed by the identity platform token endpoint.
#[derive(Debug)]
pub struct TokenCache {
    credentials: ClientCredentials,
    token_url: String,
    scope: String,
    http: reqwest::Client,
    current: RwLock<Option<IssuedToken>>,
    margin: Duration,
    tracker: Arc<dyn DependencyTracker>,
}

impl TokenCache {
    /// Token endpoint and scope are derived from the configured cloud.
    pub fn new(credentials: ClientCredentials, config: &GraphConfig) -> DirectoryResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                config.login_endpoint(),
                credentials.tenant_id
            ),
            scope: format!("{}/.default", config.graph_endpoint()),
            credentials,
            http,
            current: RwLock::new(None),
            margin: Duration::minutes(REFRESH_MARGIN_MINUTES),
            tracker: Arc::new(TracingDependencyTracker),
        })
    }

    #[must_use]
    pub fn with_tracker(mut self, tracker: Arc<dyn DependencyTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    fn cached(token: &Option<IssuedToken>, margin: Duration) -> Option<String> {
        token
            .as_ref()
            .filter(|t| t.usable_at(Utc::now(), margin))
            .map(|t| t.value.clone())
    }

    #[instrument(skip(self), fields(tenant_id = %self.credentials.tenant_id))]
    async fn current_or_refresh(&self) -> Result<String, AuthError> {
        if let Some(token) = Self::cached(&*self.current.read().await, self.margin) {
            return Ok(token);
        }

        let mut slot = self.current.write().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = Self::cached(&slot, self.margin) {
            return Ok(token);
        }

        let issued = self.request_token().await?;
        debug!(expires_at = %issued.expires_at, "Acquired access token");
        let value = issued.value.clone();
        *slot = Some(issued);
        Ok(value)
    }

    async fn request_token(&self) -> Result<IssuedToken, AuthError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.expose_secret()),
            ("scope", self.scope.as_str()),
        ];

        let started_at = Utc::now();
        let clock = Instant::now();
        let result = self.http.post(&self.token_url).form(&form).send().await;
        self.tracker.track(&DependencyObservation::http(
            "POST",
            &self.token_url,
            result.as_ref().ok().map(|r| r.status().as_u16()),
            started_at,
            clock.elapsed(),
        ));

        let response = result.map_err(|e| AuthError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        grant.into_issued(Utc::now())
    }
}

#[async_trait]
impl TokenSupplier for TokenCache {
    async fn access_token(&self) -> Result<String, AuthError> {
        self.current_or_refresh().await
    }

    async fn invalidate(&self) {
        self.current.write().await.take();
    }
}
