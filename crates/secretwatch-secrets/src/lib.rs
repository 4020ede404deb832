//! Secret store access for secretwatch.
//!
//! Logical names (`clientId`, `clientSecret`, `tenantId`, `topicEndpoint`,
//! `endpointKey`) are resolved through a [`SecretProvider`]. The provider is
//! picked by [`SecretProviderConfig`] and always wrapped in a
//! [`CachedSecretProvider`].
//!
//! ```rust,ignore
//! let provider = build_provider(&SecretProviderConfig::from_env()?)?;
//! let tenant = provider.get_secret("tenantId").await?;
//! ```

pub mod cache;
pub mod config;
pub mod provider;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;

pub use cache::CachedSecretProvider;
pub use config::{ProviderType, SecretProviderConfig, LOGICAL_SECRET_NAMES};

/// Failures while resolving a secret.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret '{name}' not found")]
    NotFound { name: String },

    /// The backing store could not be read.
    #[error("{provider} secret store unavailable: {detail}")]
    ProviderUnavailable { provider: String, detail: String },

    /// The value exists but cannot be used (not UTF-8, blank).
    #[error("secret '{name}' is unusable: {detail}")]
    InvalidValue { name: String, detail: String },

    #[error("secret store misconfigured: {detail}")]
    ConfigError { detail: String },

    #[error("secret store access denied: {detail}")]
    PermissionDenied { detail: String },
}

/// Raw bytes resolved for one logical name. `Debug` never prints the value.
#[derive(Clone)]
pub struct SecretValue {
    pub name: String,
    pub value: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretValue")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}

impl SecretValue {
    pub fn new(name: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            value,
            fetched_at: Utc::now(),
        }
    }

    /// UTF-8 view with surrounding whitespace trimmed; mounted files usually
    /// end with a newline.
    pub fn as_str(&self) -> Result<&str, SecretError> {
        match std::str::from_utf8(&self.value) {
            Ok(text) => Ok(text.trim()),
            Err(e) => Err(SecretError::InvalidValue {
                name: self.name.clone(),
                detail: format!("Not valid UTF-8: {e}"),
            }),
        }
    }

    /// Returns the trimmed value as a [`SecretString`]. Blank values are rejected.
    pub fn to_secret_string(&self) -> Result<SecretString, SecretError> {
        match self.as_str()? {
            "" => Err(SecretError::InvalidValue {
                name: self.name.clone(),
                detail: "Value is blank".to_string(),
            }),
            text => Ok(SecretString::from(text.to_owned())),
        }
    }
}

/// Resolves logical secret names.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Returns [`SecretError::NotFound`] when the name has no value.
    async fn get_secret(&self, name: &str) -> Result<SecretValue, SecretError>;

    /// Short backend name used in logs.
    fn provider_type(&self) -> &'static str;
}

/// Builds the configured provider behind a TTL cache.
pub fn build_provider(
    config: &SecretProviderConfig,
) -> Result<Arc<dyn SecretProvider>, SecretError> {
    let backend: Arc<dyn SecretProvider> = match config.provider_type {
        ProviderType::Env => Arc::new(provider::env::EnvSecretProvider::new(
            config.secret_mappings.clone(),
        )),
        ProviderType::File => Arc::new(provider::file::FileSecretProvider::new(config)?),
    };

    tracing::info!(
        provider = backend.provider_type(),
        cache_ttl_seconds = config.cache_ttl_seconds,
        "Secret provider ready"
    );

    Ok(Arc::new(CachedSecretProvider::new(
        backend,
        config.cache_ttl_seconds,
    )))
}
