//! Environment variable secret provider.
//!
//! Maps logical secret names to environment variable names using the
//! `SCREAMING_SNAKE_CASE` convention (`clientId` → `CLIENT_ID`). This is the
//! default provider.

use async_trait::async_trait;
use std::collections::HashMap;

use heck::{ToShoutySnakeCase, ToSnakeCase};

use crate::{SecretError, SecretProvider, SecretValue};

/// Secret provider that reads secrets from environment variables.
///
/// Logical names are mapped to env var names via the `mappings` `HashMap`,
/// or by converting to `SCREAMING_SNAKE_CASE` if no explicit mapping exists.
#[derive(Debug)]
pub struct EnvSecretProvider {
    /// `snake_case` logical name to env var name, from `SECRET_MAP_*`.
    mappings: HashMap<String, String>,
}

impl EnvSecretProvider {
    /// Create a new `EnvSecretProvider` with the given logical name mappings.
    #[must_use]
    pub fn new(mappings: HashMap<String, String>) -> Self {
        Self { mappings }
    }

    /// Resolve a logical secret name to an environment variable name.
    fn resolve_env_var_name(&self, logical_name: &str) -> String {
        match self.mappings.get(&logical_name.to_snake_case()) {
            Some(mapped) => mapped.clone(),
            None => logical_name.to_shouty_snake_case(),
        }
    }
}

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn get_secret(&self, name: &str) -> Result<SecretValue, SecretError> {
        let env_var = self.resolve_env_var_name(name);

        match std::env::var(&env_var) {
            Ok(value) if !value.trim().is_empty() => {
                tracing::debug!(
                    secret_name = name,
                    env_var = %env_var,
                    "Secret loaded from environment variable"
                );
                Ok(SecretValue::new(name, value.into_bytes()))
            }
            // Empty value treated as not found
            _ => Err(SecretError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    fn provider_type(&self) -> &'static str {
        "env"
    }
}
