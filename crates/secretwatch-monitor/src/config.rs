//! Monitor configuration loaded from environment variables.

use std::env::VarError;
use std::str::FromStr;
use std::time::Duration;

use secretwatch_core::{ExpiryClassifier, DEFAULT_WARNING_WINDOW_DAYS};
use secretwatch_events::{PublisherConfig, DEFAULT_EVENT_SOURCE};
use secretwatch_graph::{ClientCredentials, CloudEnvironment, GraphConfig, RetryPolicy};
use secretwatch_secrets::{SecretError, SecretProvider};

/// Default interval between runs (daily).
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 86400;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration for the expiry monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Interval between scheduled runs.
    pub scan_interval: Duration,

    /// Run once immediately when the scheduler starts.
    /// Default: false (first run after one interval).
    pub run_on_startup: bool,

    /// Upper bound (inclusive) of the expiring-soon window in days.
    pub expiry_warning_days: f64,

    /// Event delivery tuning.
    pub publisher: PublisherConfig,

    /// Microsoft Graph settings.
    pub graph: GraphConfig,

    /// CloudEvents `source` attribute.
    pub event_source: String,

    pub log_format: LogFormat,
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// This allows tests to supply variables without mutating process-global
    /// environment state.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let scan_interval_secs: u64 =
            parse_or(&reader, "SCAN_INTERVAL_SECS", DEFAULT_SCAN_INTERVAL_SECS)?;
        if scan_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SCAN_INTERVAL_SECS".into(),
                "must be > 0".into(),
            ));
        }

        let run_on_startup = parse_or(&reader, "RUN_ON_STARTUP", false)?;

        let expiry_warning_days: f64 =
            parse_or(&reader, "EXPIRY_WARNING_DAYS", DEFAULT_WARNING_WINDOW_DAYS)?;
        if ExpiryClassifier::with_warning_window(expiry_warning_days).is_none() {
            return Err(ConfigError::InvalidValue(
                "EXPIRY_WARNING_DAYS".into(),
                "must be a finite number of days > 0".into(),
            ));
        }

        let publish_concurrency: usize = parse_or(&reader, "PUBLISH_CONCURRENCY", 4)?;
        if publish_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "PUBLISH_CONCURRENCY".into(),
                "must be >= 1".into(),
            ));
        }
        let publish_timeout_secs: u64 = parse_or(&reader, "PUBLISH_TIMEOUT_SECS", 30)?;

        let graph = graph_config(&reader)?;

        let event_source = reader("EVENT_SOURCE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_SOURCE.to_string());

        let log_format = match reader("LOG_FORMAT")
            .unwrap_or_else(|_| "text".to_string())
            .trim()
            .to_lowercase()
            .as_str()
        {
            "text" | "" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LOG_FORMAT".into(),
                    format!("expected 'text' or 'json', got '{other}'"),
                ))
            }
        };

        Ok(Self {
            scan_interval: Duration::from_secs(scan_interval_secs),
            run_on_startup,
            expiry_warning_days,
            publisher: PublisherConfig {
                concurrency: publish_concurrency,
                timeout: Duration::from_secs(publish_timeout_secs),
            },
            graph,
            event_source,
            log_format,
        })
    }

    /// Classifier for the configured warning window.
    #[must_use]
    pub fn classifier(&self) -> ExpiryClassifier {
        ExpiryClassifier::with_warning_window(self.expiry_warning_days).unwrap_or_default()
    }
}

fn graph_config<F>(reader: &F) -> Result<GraphConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let cloud = match reader("GRAPH_CLOUD") {
        Ok(value) => CloudEnvironment::parse(&value)
            .map_err(|e| ConfigError::InvalidValue("GRAPH_CLOUD".into(), e.to_string()))?,
        Err(_) => CloudEnvironment::default(),
    };

    let optional = |key: &str| {
        reader(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let config = GraphConfig {
        cloud,
        login_endpoint: optional("GRAPH_LOGIN_ENDPOINT"),
        graph_endpoint: optional("GRAPH_ENDPOINT"),
        api_version: optional("GRAPH_API_VERSION").unwrap_or_else(|| "v1.0".to_string()),
        page_size: parse_or(reader, "GRAPH_PAGE_SIZE", 100)?,
        request_timeout: Duration::from_secs(parse_or(reader, "GRAPH_TIMEOUT_SECS", 30)?),
        retry: RetryPolicy {
            max_retries: parse_or(reader, "GRAPH_MAX_RETRIES", 5)?,
            ..RetryPolicy::default()
        },
    };

    config
        .validate()
        .map_err(|e| ConfigError::InvalidValue("GRAPH_*".into(), e.to_string()))?;

    Ok(config)
}

/// Parses `key`, falling back to `default` when unset or blank.
fn parse_or<F, T>(reader: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match reader(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.into(), e.to_string())),
        _ => Ok(default),
    }
}

/// Logical secret names of the directory credentials.
pub const CLIENT_ID_SECRET: &str = "clientId";
pub const CLIENT_SECRET_SECRET: &str = "clientSecret";
pub const TENANT_ID_SECRET: &str = "tenantId";

/// Resolves the directory credentials from the secret store.
///
/// Called once at startup; any failure aborts startup.
pub async fn resolve_client_credentials(
    secrets: &dyn SecretProvider,
) -> Result<ClientCredentials, ConfigError> {
    let client_id = secrets.get_secret(CLIENT_ID_SECRET).await?;
    let client_secret = secrets.get_secret(CLIENT_SECRET_SECRET).await?;
    let tenant_id = secrets.get_secret(TENANT_ID_SECRET).await?;

    Ok(ClientCredentials {
        tenant_id: tenant_id.as_str()?.to_string(),
        client_id: client_id.as_str()?.to_string(),
        client_secret: client_secret.to_secret_string()?,
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("secret unavailable: {0}")]
    Secret(#[from] SecretError),
}
