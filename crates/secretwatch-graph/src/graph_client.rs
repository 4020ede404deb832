//! Authenticated Graph requests: bearer injection, throttling retries, OData
//! error mapping and `@odata.nextLink` traversal.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::StatusCode;
use secretwatch_core::{DependencyObservation, DependencyTracker, TracingDependencyTracker};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::retry::RetryPolicy;
use crate::{DirectoryError, DirectoryResult, GraphConfig, TokenSupplier};

/// Graph error document: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
pub struct ODataError {
    pub error: ODataErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ODataErrorBody {
    pub code: String,
    pub message: String,
}

/// One page of a Graph collection.
#[derive(Debug, Deserialize)]
pub struct ODataResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Raw result of a single HTTP attempt.
struct Attempt {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Attempt {
    fn is_retryable(&self) -> bool {
        matches!(
            self.status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        )
    }

    /// `Retry-After` seconds, honoured for 429 only.
    fn retry_after(&self) -> Option<u64> {
        if self.status != StatusCode::TOO_MANY_REQUESTS {
            return None;
        }
        self.headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(RetryPolicy::parse_retry_after)
    }

    fn into_error(self) -> DirectoryError {
        let status = self.status.as_u16();
        let reason = self
            .status
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();

        match serde_json::from_str::<ODataError>(&self.body) {
            Ok(odata) => DirectoryError::GraphApi {
                status,
                reason,
                code: odata.error.code,
                message: odata.error.message,
            },
            Err(_) => DirectoryError::GraphApi {
                status,
                code: reason.clone(),
                reason,
                message: self.body,
            },
        }
    }
}

/// Graph client bound to one token supplier and one cloud.
#[derive(Debug)]
pub struct GraphClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSupplier>,
    config: GraphConfig,
    tracker: Arc<dyn DependencyTracker>,
}

impl GraphClient {
    /// Validates `config` and builds the HTTP client.
    pub fn new(tokens: Arc<dyn TokenSupplier>, config: GraphConfig) -> DirectoryResult<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            tokens,
            config,
            tracker: Arc::new(TracingDependencyTracker),
        })
    }

    #[must_use]
    pub fn with_tracker(mut self, tracker: Arc<dyn DependencyTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// `{graph_endpoint}/{api_version}`
    #[must_use]
    pub fn base_url(&self) -> String {
        self.config.base_url()
    }

    #[must_use]
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    async fn send(&self, url: &str) -> DirectoryResult<Attempt> {
        let token = self.tokens.access_token().await?;

        let started_at = Utc::now();
        let clock = Instant::now();
        let result = self
            .http
            .get(url)
            .bearer_auth(&token)
            .header(ACCEPT, "application/json")
            .send()
            .await;
        self.tracker.track(&DependencyObservation::http(
            "GET",
            url,
            result.as_ref().ok().map(|r| r.status().as_u16()),
            started_at,
            clock.elapsed(),
        ));

        let response = result?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(Attempt {
            status,
            headers,
            body,
        })
    }

    /// GETs `url` and deserializes the body.
    ///
    /// 429/502/503/504 are retried up to `retry.max_retries` times. A 401 drops
    /// the cached token and is retried once with a fresh one.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> DirectoryResult<T> {
        let policy = &self.config.retry;
        let mut retries = 0u32;
        let mut token_refreshed = false;

        loop {
            let attempt = self.send(url).await?;

            if attempt.status.is_success() {
                return serde_json::from_str(&attempt.body).map_err(DirectoryError::from);
            }

            if attempt.status == StatusCode::UNAUTHORIZED && !token_refreshed {
                debug!("Graph rejected the access token, refreshing");
                self.tokens.invalidate().await;
                token_refreshed = true;
                continue;
            }

            if !attempt.is_retryable() {
                return Err(attempt.into_error());
            }

            if retries >= policy.max_retries {
                return Err(DirectoryError::MaxRetriesExceeded {
                    attempts: retries,
                    status: attempt.status.as_u16(),
                });
            }

            let delay = policy.delay_for(attempt.retry_after(), retries);
            retries += 1;
            warn!(
                status = attempt.status.as_u16(),
                retry = retries,
                max_retries = policy.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Graph request throttled or unavailable, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Walks every page starting at `initial_url`, handing each page's items
    /// to `on_page`. Returns the number of pages fetched.
    #[instrument(skip(self, on_page))]
    pub async fn get_paginated<T, F>(
        &self,
        initial_url: &str,
        mut on_page: F,
    ) -> DirectoryResult<usize>
    where
        T: DeserializeOwned,
        F: FnMut(Vec<T>) -> DirectoryResult<()>,
    {
        let mut url = initial_url.to_string();
        let mut visited = HashSet::new();
        let mut pages = 0usize;

        loop {
            visited.insert(url.clone());
            let page: ODataResponse<T> = self.get(&url).await?;
            pages += 1;
            debug!(page = pages, items = page.value.len(), "Fetched page");
            on_page(page.value)?;

            url = match page.next_link {
                None => return Ok(pages),
                Some(next) if visited.contains(&next) => {
                    return Err(DirectoryError::Pagination(format!(
                        "nextLink revisits an already fetched page after {pages} pages"
                    )));
                }
                Some(next) if !self.is_graph_url(&next) => {
                    return Err(DirectoryError::Pagination(format!(
                        "nextLink points outside {}: {next}",
                        self.config.graph_endpoint()
                    )));
                }
                Some(next) => next,
            };
        }
    }

    /// True when `candidate` has the same origin as the Graph endpoint.
    fn is_graph_url(&self, candidate: &str) -> bool {
        match (
            Url::parse(candidate),
            Url::parse(self.config.graph_endpoint()),
        ) {
            (Ok(candidate), Ok(graph)) => candidate.origin() == graph.origin(),
            _ => false,
        }
    }
}
