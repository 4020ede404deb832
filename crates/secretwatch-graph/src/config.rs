//! Directory connection settings.

use secrecy::SecretString;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::{DirectoryError, DirectoryResult};

/// Largest `$top` value Microsoft Graph accepts for `/applications`.
pub const MAX_PAGE_SIZE: u32 = 999;

/// Azure cloud environment for national cloud support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloudEnvironment {
    /// Azure commercial cloud (default).
    #[default]
    Commercial,
    /// Azure US Government cloud.
    UsGovernment,
    /// Azure China cloud (21Vianet).
    China,
    /// Azure Germany cloud.
    Germany,
}

impl CloudEnvironment {
    /// Returns the login endpoint for this cloud environment.
    #[must_use]
    pub fn login_endpoint(&self) -> &'static str {
        match self {
            Self::Commercial => "https://login.microsoftonline.com",
            Self::UsGovernment => "https://login.microsoftonline.us",
            Self::China => "https://login.chinacloudapi.cn",
            Self::Germany => "https://login.microsoftonline.de",
        }
    }

    /// Returns the Graph API endpoint for this cloud environment.
    #[must_use]
    pub fn graph_endpoint(&self) -> &'static str {
        match self {
            Self::Commercial => "https://graph.microsoft.com",
            Self::UsGovernment => "https://graph.microsoft.us",
            Self::China => "https://microsoftgraph.chinacloudapi.cn",
            Self::Germany => "https://graph.microsoft.de",
        }
    }

    /// Parses a `GRAPH_CLOUD` value (`commercial`, `us_government`, `china`, `germany`).
    pub fn parse(value: &str) -> DirectoryResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "commercial" | "global" => Ok(Self::Commercial),
            "us_government" | "usgovernment" | "usgov" => Ok(Self::UsGovernment),
            "china" => Ok(Self::China),
            "germany" => Ok(Self::Germany),
            other => Err(DirectoryError::Config(format!(
                "unknown cloud environment '{other}'"
            ))),
        }
    }
}

/// Application credentials used for the client-credentials grant.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    /// Directory (tenant) ID.
    pub tenant_id: String,
    /// Application (client) ID.
    pub client_id: String,
    /// Client secret.
    pub client_secret: SecretString,
}

/// Settings for talking to Microsoft Graph.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// National cloud the tenant lives in.
    pub cloud: CloudEnvironment,
    /// Overrides the cloud's login endpoint.
    pub login_endpoint: Option<String>,
    /// Overrides the cloud's Graph endpoint.
    pub graph_endpoint: Option<String>,
    /// Graph API version segment, e.g. `v1.0`.
    pub api_version: String,
    /// `$top` page size for the applications listing.
    pub page_size: u32,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Throttling and transient failure handling.
    pub retry: RetryPolicy,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            cloud: CloudEnvironment::default(),
            login_endpoint: None,
            graph_endpoint: None,
            api_version: "v1.0".to_string(),
            page_size: 100,
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl GraphConfig {
    /// Effective login endpoint without a trailing slash.
    #[must_use]
    pub fn login_endpoint(&self) -> &str {
        self.login_endpoint
            .as_deref()
            .unwrap_or_else(|| self.cloud.login_endpoint())
            .trim_end_matches('/')
    }

    /// Effective Graph endpoint without a trailing slash.
    #[must_use]
    pub fn graph_endpoint(&self) -> &str {
        self.graph_endpoint
            .as_deref()
            .unwrap_or_else(|| self.cloud.graph_endpoint())
            .trim_end_matches('/')
    }

    /// Versioned Graph base URL, e.g. `https://graph.microsoft.com/v1.0`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}/{}", self.graph_endpoint(), self.api_version)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.api_version.trim().is_empty() {
            return Err(DirectoryError::Config(
                "api_version must not be empty".to_string(),
            ));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(DirectoryError::Config(format!(
                "page_size must be in range [1, {MAX_PAGE_SIZE}]"
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(DirectoryError::Config(
                "request_timeout must be > 0".to_string(),
            ));
        }
        for endpoint in [self.login_endpoint(), self.graph_endpoint()] {
            url::Url::parse(endpoint).map_err(|e| {
                DirectoryError::Config(format!("invalid endpoint '{endpoint}': {e}"))
            })?;
        }
        self.retry.validate().map_err(DirectoryError::Config)
    }
}
