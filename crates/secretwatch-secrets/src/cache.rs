//! TTL caching in front of a secret provider.
//!
//! Values older than the TTL are refetched. If the refetch fails, the last
//! known value is returned and the failure is logged, so a brief outage of the
//! backing store does not fail a run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{SecretError, SecretProvider, SecretValue};

/// Result of looking a name up in the cache.
#[derive(Debug, Clone)]
enum Lookup {
    Fresh(SecretValue),
    Stale(SecretValue),
    Missing,
}

#[derive(Debug)]
struct Entry {
    value: SecretValue,
    stored: Instant,
}

/// Caching wrapper around any [`SecretProvider`].
pub struct CachedSecretProvider {
    inner: Arc<dyn SecretProvider>,
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl CachedSecretProvider {
    pub fn new(inner: Arc<dyn SecretProvider>, cache_ttl_seconds: u64) -> Self {
        Self {
            inner,
            ttl: Duration::from_secs(cache_ttl_seconds),
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn lookup(&self, name: &str) -> Lookup {
        match self.entries.read().await.get(name) {
            Some(entry) if entry.stored.elapsed() < self.ttl => Lookup::Fresh(entry.value.clone()),
            Some(entry) => Lookup::Stale(entry.value.clone()),
            None => Lookup::Missing,
        }
    }

    async fn store(&self, value: SecretValue) {
        let entry = Entry {
            stored: Instant::now(),
            value,
        };
        self.entries
            .write()
            .await
            .insert(entry.value.name.clone(), entry);
    }
}

impl std::fmt::Debug for CachedSecretProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedSecretProvider")
            .field("inner", &self.inner.provider_type())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretProvider for CachedSecretProvider {
    async fn get_secret(&self, name: &str) -> Result<SecretValue, SecretError> {
        let stale = match self.lookup(name).await {
            Lookup::Fresh(value) => return Ok(value),
            Lookup::Stale(value) => Some(value),
            Lookup::Missing => None,
        };

        match self.inner.get_secret(name).await {
            Ok(value) => {
                tracing::debug!(
                    secret_name = name,
                    provider = self.inner.provider_type(),
                    refreshed = stale.is_some(),
                    "Secret fetched"
                );
                self.store(value.clone()).await;
                Ok(value)
            }
            Err(e) => match stale {
                Some(value) => {
                    tracing::warn!(
                        secret_name = name,
                        provider = self.inner.provider_type(),
                        error = %e,
                        "Secret refresh failed, serving last known value"
                    );
                    Ok(value)
                }
                None => Err(e),
            },
        }
    }

    fn provider_type(&self) -> &'static str {
        self.inner.provider_type()
    }
}
