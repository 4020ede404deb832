//! File-based secret provider for Kubernetes volume mounts.
//!
//! Reads secrets from filesystem paths configured via `SECRET_MAP`_* env vars.
//! Files are re-read on every cache miss, so rotated mounts are picked up once
//! the cache TTL elapses.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use heck::ToSnakeCase;

use crate::config::SecretProviderConfig;
use crate::{SecretError, SecretProvider, SecretValue};

/// Secret provider that reads secrets from filesystem paths.
#[derive(Debug)]
pub struct FileSecretProvider {
    /// Maps `snake_case` logical secret name → file path.
    path_mappings: HashMap<String, PathBuf>,
}

impl FileSecretProvider {
    /// Create a new `FileSecretProvider` from configuration.
    pub fn new(config: &SecretProviderConfig) -> Result<Self, SecretError> {
        if config.secret_mappings.is_empty() {
            return Err(SecretError::ConfigError {
                detail: "SECRET_PROVIDER=file requires at least one SECRET_MAP_* mapping"
                    .to_string(),
            });
        }

        let path_mappings = config
            .secret_mappings
            .iter()
            .map(|(name, path)| (name.clone(), PathBuf::from(path)))
            .collect();

        Ok(Self { path_mappings })
    }

    /// Warn if a secret file is world-readable.
    #[cfg(unix)]
    fn check_permissions(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mode = metadata.permissions().mode();
            if mode & 0o004 != 0 {
                tracing::warn!(
                    path = %path.display(),
                    mode = format!("{:o}", mode),
                    "Secret file is world-readable. Consider restricting permissions to 0600."
                );
            }
        }
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) {}
}

#[async_trait]
impl SecretProvider for FileSecretProvider {
    async fn get_secret(&self, name: &str) -> Result<SecretValue, SecretError> {
        let path = self
            .path_mappings
            .get(&name.to_snake_case())
            .ok_or_else(|| SecretError::NotFound {
                name: name.to_string(),
            })?;

        Self::check_permissions(path);

        let contents = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SecretError::NotFound {
                name: name.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => SecretError::PermissionDenied {
                detail: format!(
                    "Cannot read secret file '{}': permission denied",
                    path.display()
                ),
            },
            _ => SecretError::ProviderUnavailable {
                provider: "file".to_string(),
                detail: format!("Failed to read '{}': {e}", path.display()),
            },
        })?;

        if contents.iter().all(u8::is_ascii_whitespace) {
            return Err(SecretError::InvalidValue {
                name: name.to_string(),
                detail: format!("Secret file '{}' is empty", path.display()),
            });
        }

        tracing::debug!(
            secret_name = name,
            path = %path.display(),
            "Secret loaded from file"
        );

        Ok(SecretValue::new(name, contents))
    }

    fn provider_type(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir, files: &[(&str, &str)]) -> SecretProviderConfig {
        let vars: HashMap<String, String> = files
            .iter()
            .map(|(map_name, file)| {
                (
                    format!("SECRET_MAP_{map_name}"),
                    dir.path().join(file).display().to_string(),
                )
            })
            .chain([("SECRET_PROVIDER".to_string(), "file".to_string())])
            .collect();
        SecretProviderConfig::from_reader(move |key| {
            vars.get(key).cloned().ok_or(std::env::VarError::NotPresent)
        })
        .unwrap()
    }

    #[test]
    fn test_requires_mappings() {
        let config = SecretProviderConfig::from_reader(|key| match key {
            "SECRET_PROVIDER" => Ok("file".to_string()),
            _ => Err(std::env::VarError::NotPresent),
        })
        .unwrap();
        assert!(matches!(
            FileSecretProvider::new(&config),
            Err(SecretError::ConfigError { .. })
        ));
    }

    #[tokio::test]
    async fn test_reads_mapped_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("client-secret"), "s3cr3t\n").unwrap();

        let config = config_for(&dir, &[("CLIENT_SECRET", "client-secret")]);
        let provider = FileSecretProvider::new(&config).unwrap();

        let sv = provider.get_secret("clientSecret").await.unwrap();
        assert_eq!(sv.as_str().unwrap(), "s3cr3t");
        assert_eq!(provider.provider_type(), "file");
    }

    #[tokio::test]
    async fn test_unmapped_name_not_found() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir, &[("CLIENT_SECRET", "client-secret")]);
        let provider = FileSecretProvider::new(&config).unwrap();

        assert!(matches!(
            provider.get_secret("tenantId").await,
            Err(SecretError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_file_not_found() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir, &[("TENANT_ID", "does-not-exist")]);
        let provider = FileSecretProvider::new(&config).unwrap();

        assert!(matches!(
            provider.get_secret("tenantId").await,
            Err(SecretError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_file_invalid() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("endpoint-key"), "\n").unwrap();
        let config = config_for(&dir, &[("ENDPOINT_KEY", "endpoint-key")]);
        let provider = FileSecretProvider::new(&config).unwrap();

        assert!(matches!(
            provider.get_secret("endpointKey").await,
            Err(SecretError::InvalidValue { .. })
        ));
    }
}
