//! External identity provider integration
//!
//! Archival removes a user's login identity from the external auth
//! system after the account snapshot is safely stored. The provider is
//! a trait so deployments without an external identity store can run
//! with the no-op implementation.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use crate::config::settings::IdentityConfig;
use crate::utils::errors::{IdentityError, IdentityResult};

/// External authentication system operations
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Delete the login identity behind an external id
    ///
    /// Deleting an identity that is already gone is not an error.
    async fn delete_identity(&self, external_id: &str) -> IdentityResult<()>;
}

/// HTTP identity provider client
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    api_url: String,
}

impl HttpIdentityProvider {
    pub fn new(api_url: &str, timeout_seconds: u64) -> IdentityResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent("Reprise/1.0")
            .build()
            .map_err(|e| IdentityError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a provider from configuration, if one is configured
    pub fn from_config(config: &IdentityConfig) -> IdentityResult<Option<Self>> {
        match &config.api_url {
            Some(api_url) => Ok(Some(Self::new(api_url, config.timeout_seconds)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn delete_identity(&self, external_id: &str) -> IdentityResult<()> {
        let url = format!("{}/accounts/{}", self.api_url, external_id);
        debug!(external_id = external_id, "Deleting external identity");

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IdentityError::Timeout
                } else if e.is_connect() {
                    IdentityError::ServiceUnavailable
                } else {
                    IdentityError::RequestFailed(e.to_string())
                }
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            // Already gone; archival proceeds
            warn!(external_id = external_id, "Identity was already deleted");
            return Ok(());
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(IdentityError::RequestFailed(format!("HTTP {}: {}", status, error_text)));
        }

        Ok(())
    }
}

/// Identity provider that does nothing
///
/// Used when no external auth system is configured.
#[derive(Debug, Clone, Default)]
pub struct NoopIdentityProvider;

#[async_trait]
impl IdentityProvider for NoopIdentityProvider {
    async fn delete_identity(&self, external_id: &str) -> IdentityResult<()> {
        debug!(external_id = external_id, "No identity provider configured, skipping deletion");
        Ok(())
    }
}
