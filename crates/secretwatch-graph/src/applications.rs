//! Application registration scanning.
//!
//! Walks `/applications` to the last page and flattens every password
//! credential into a [`CredentialRecord`]. Credentials that cannot be
//! normalized are skipped and counted; they never abort the scan.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secretwatch_core::CredentialRecord;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::{DirectoryResult, GraphClient};

/// Fields requested from `/applications`.
const APPLICATION_SELECT: &str = "id,appId,displayName,passwordCredentials";

/// Application registration as returned by Microsoft Graph.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Null and absent are both treated as no credentials.
    #[serde(default)]
    pub password_credentials: Option<Vec<PasswordCredentialResource>>,
}

/// Password credential (client secret) on an application registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordCredentialResource {
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default)]
    pub end_date_time: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl PasswordCredentialResource {
    /// Normalizes the credential, or explains why it cannot be.
    pub fn to_record(&self, application_name: &str) -> Result<CredentialRecord, String> {
        let key_id = self
            .key_id
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| "missing keyId".to_string())?;

        let raw_end = self
            .end_date_time
            .as_deref()
            .ok_or_else(|| "missing endDateTime".to_string())?;

        let expires_at = DateTime::parse_from_rfc3339(raw_end)
            .map_err(|e| format!("invalid endDateTime '{raw_end}': {e}"))?
            .with_timezone(&Utc);

        Ok(CredentialRecord::new(application_name, key_id, expires_at))
    }
}

impl ApplicationResource {
    /// Display name, or the empty string when the directory has none.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or_default()
    }

    /// Password credentials, empty when null or absent.
    #[must_use]
    pub fn credentials(&self) -> &[PasswordCredentialResource] {
        self.password_credentials.as_deref().unwrap_or_default()
    }
}

/// Outcome of a full directory traversal.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScan {
    /// One record per valid password credential, in directory order.
    pub records: Vec<CredentialRecord>,
    /// Applications seen across all pages.
    pub applications_scanned: usize,
    /// Pages retrieved.
    pub pages_fetched: usize,
    /// Credentials dropped because they could not be normalized.
    pub skipped_credentials: usize,
}

impl DirectoryScan {
    /// Folds one page of applications into the scan.
    pub fn absorb(&mut self, applications: Vec<ApplicationResource>) {
        for application in applications {
            self.applications_scanned += 1;
            for credential in application.credentials() {
                match credential.to_record(application.name()) {
                    Ok(record) => {
                        let record = match application.app_id.as_deref() {
                            Some(app_id) => record.with_application_id(app_id),
                            None => record,
                        };
                        self.records.push(record);
                    }
                    Err(reason) => {
                        self.skipped_credentials += 1;
                        warn!(
                            application_name = application.name(),
                            application_object_id = ?application.id,
                            reason = %reason,
                            "Skipping unparseable password credential"
                        );
                    }
                }
            }
        }
    }
}

/// Source of credential records.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Retrieves every credential record in the directory.
    ///
    /// Any failure aborts the whole scan; partial results are never returned.
    async fn scan(&self) -> DirectoryResult<DirectoryScan>;
}

/// Scans application registrations through Microsoft Graph.
#[derive(Debug)]
pub struct DirectoryScanner {
    client: GraphClient,
}

impl DirectoryScanner {
    /// Creates a scanner over the given client.
    #[must_use]
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// First-page URL for the applications listing.
    #[must_use]
    pub fn applications_url(&self) -> String {
        format!(
            "{}/applications?$select={}&$top={}",
            self.client.base_url(),
            APPLICATION_SELECT,
            self.client.config().page_size
        )
    }
}

#[async_trait]
impl CredentialSource for DirectoryScanner {
    #[instrument(skip(self))]
    async fn scan(&self) -> DirectoryResult<DirectoryScan> {
        let mut scan = DirectoryScan::default();

        let pages = self
            .client
            .get_paginated(&self.applications_url(), |page: Vec<ApplicationResource>| {
                scan.absorb(page);
                Ok(())
            })
            .await?;
        scan.pages_fetched = pages;

        info!(
            applications_scanned = scan.applications_scanned,
            credentials_found = scan.records.len(),
            skipped_credentials = scan.skipped_credentials,
            pages_fetched = scan.pages_fetched,
            "Directory scan completed"
        );

        Ok(scan)
    }
}
