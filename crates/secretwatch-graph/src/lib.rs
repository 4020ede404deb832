//! Microsoft Graph directory scanner for secretwatch.
//!
//! Retrieves every application registration from the directory, following
//! `@odata.nextLink` pagination until exhausted, and normalizes each password
//! credential into a [`CredentialRecord`](secretwatch_core::CredentialRecord).
//!
//! # Features
//!
//! - `OAuth2` client credentials authentication with token caching
//! - Full pagination traversal of `/applications`
//! - Retry with `Retry-After` handling for 429 and backoff for 502/503/504
//! - One dependency observation per outbound HTTP call
//! - National cloud endpoints (Commercial, US Government, China, Germany)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use secretwatch_graph::{
//!     ClientCredentials, CredentialSource, DirectoryScanner, GraphClient, GraphConfig, TokenCache,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GraphConfig::default();
//! let credentials = ClientCredentials {
//!     tenant_id: "your-tenant-id".to_string(),
//!     client_id: "your-client-id".to_string(),
//!     client_secret: "your-client-secret".to_string().into(),
//! };
//!
//! let tokens = Arc::new(TokenCache::new(credentials, &config)?);
//! let scanner = DirectoryScanner::new(GraphClient::new(tokens, config)?);
//! let scan = scanner.scan().await?;
//! println!("{} credentials found", scan.records.len());
//! # Ok(())
//! # }
//! ```

mod applications;
mod auth;
mod config;
mod error;
mod graph_client;
mod retry;

// Re-exports
pub use applications::{
    ApplicationResource, CredentialSource, DirectoryScan, DirectoryScanner,
    PasswordCredentialResource,
};
pub use auth::{TokenCache, TokenSupplier};
pub use config::{ClientCredentials, CloudEnvironment, GraphConfig};
pub use error::{AuthError, DirectoryError, DirectoryResult};
pub use graph_client::{GraphClient, ODataError, ODataResponse};
pub use retry::RetryPolicy;
