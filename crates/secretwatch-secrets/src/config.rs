//! Secret provider configuration parsed from environment variables.

use std::collections::HashMap;
use std::env::VarError;

use heck::{ToShoutySnakeCase, ToSnakeCase};

use crate::SecretError;

/// Which secret provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// Read from environment variables (default).
    Env,
    /// Read from filesystem paths (e.g. Kubernetes secret volumes).
    File,
}

impl ProviderType {
    /// Parse from string value (case-insensitive).
    pub fn from_str_value(s: &str) -> Result<Self, SecretError> {
        match s.to_lowercase().as_str() {
            "env" | "environment" => Ok(Self::Env),
            "file" | "filesystem" => Ok(Self::File),
            other => Err(SecretError::ConfigError {
                detail: format!("unknown SECRET_PROVIDER '{other}', expected env or file"),
            }),
        }
    }
}

/// Default cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Complete secret provider configuration.
#[derive(Debug, Clone)]
pub struct SecretProviderConfig {
    /// Which provider to use.
    pub provider_type: ProviderType,
    /// Maps `snake_case` logical name → provider-specific location
    /// (env var name for `Env`, file path for `File`).
    pub secret_mappings: HashMap<String, String>,
    /// Cache TTL in seconds (default: 300 = 5 minutes).
    pub cache_ttl_seconds: u64,
}

/// Logical names the service resolves. Each may be remapped with
/// `SECRET_MAP_<SHOUTY_SNAKE_NAME>`.
pub const LOGICAL_SECRET_NAMES: [&str; 5] = [
    "clientId",
    "clientSecret",
    "tenantId",
    "topicEndpoint",
    "endpointKey",
];

impl SecretProviderConfig {
    /// Parse configuration from the process environment.
    ///
    /// Reads:
    /// - `SECRET_PROVIDER`: `env` (default) or `file`
    /// - `SECRET_CACHE_TTL_SECONDS`: cache TTL, default 300
    /// - `SECRET_MAP_{NAME}`: explicit variable name or file path per secret
    pub fn from_env() -> Result<Self, SecretError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Parse configuration through `reader`, which has the shape of
    /// [`std::env::var`].
    pub fn from_reader<F>(reader: F) -> Result<Self, SecretError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let provider_type = match reader("SECRET_PROVIDER") {
            Ok(s) if !s.trim().is_empty() => ProviderType::from_str_value(s.trim())?,
            _ => ProviderType::Env,
        };

        let cache_ttl_seconds = match reader("SECRET_CACHE_TTL_SECONDS") {
            Ok(s) => s.trim().parse::<u64>().map_err(|e| SecretError::ConfigError {
                detail: format!("Invalid SECRET_CACHE_TTL_SECONDS '{s}': {e}"),
            })?,
            Err(_) => DEFAULT_CACHE_TTL_SECONDS,
        };

        let secret_mappings = LOGICAL_SECRET_NAMES
            .iter()
            .filter_map(|name| {
                let var = format!("SECRET_MAP_{}", name.to_shouty_snake_case());
                reader(&var)
                    .ok()
                    .filter(|value| !value.trim().is_empty())
                    .map(|value| (name.to_snake_case(), value))
            })
            .collect();

        Ok(Self {
            provider_type,
            secret_mappings,
            cache_ttl_seconds,
        })
    }
}
