//! Managed identity credential via the instance metadata service
//!
//! Available only when running on provider-managed compute. The metadata
//! endpoint is tenant-bound already, so this strategy ignores tenant
//! pinning. A client id may be supplied to select a user-assigned identity.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::{cancellable, AccessToken, TokenCredential};
use crate::error::{Result, VideoIndexerError};

/// Instance metadata service endpoint for managed identity tokens
const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// API version understood by the metadata endpoint
const IMDS_API_VERSION: &str = "2018-02-01";

/// Response from the metadata token endpoint
#[derive(Debug, Deserialize)]
struct ImdsTokenResponse {
    access_token: String,
    /// Token expiry as a Unix timestamp string
    expires_on: String,
}

/// A credential backed by the compute platform's managed identity.
#[derive(Debug)]
pub struct ImdsCredential {
    http: reqwest::Client,
    endpoint: String,
    /// Client id of a user-assigned identity; None for system-assigned
    client_id: Option<String>,
}

impl ImdsCredential {
    pub fn new(http: reqwest::Client, client_id: Option<String>) -> Self {
        Self {
            http,
            endpoint: IMDS_ENDPOINT.to_string(),
            client_id,
        }
    }

    #[cfg(test)]
    fn with_endpoint(http: reqwest::Client, endpoint: String, client_id: Option<String>) -> Self {
        Self {
            http,
            endpoint,
            client_id,
        }
    }

    fn request_url(&self, scope: &str) -> Result<Url> {
        // The metadata endpoint takes the bare resource, not a v2.0 scope
        let resource = scope.trim_end_matches("/.default");

        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            VideoIndexerError::Credential(format!("invalid metadata endpoint URL: {}", e))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api-version", IMDS_API_VERSION);
            query.append_pair("resource", resource);
            if let Some(client_id) = &self.client_id {
                query.append_pair("client_id", client_id);
            }
        }

        Ok(url)
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken> {
        let url = self.request_url(scope)?;

        debug!("requesting token from instance metadata service");

        let response = self
            .http
            .get(url)
            .header("Metadata", "true")
            .send()
            .await
            .map_err(|e| {
                VideoIndexerError::Credential(format!(
                    "metadata service unreachable (not running on managed compute?): {}",
                    e
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VideoIndexerError::Credential(format!(
                "metadata service returned {}: {}",
                status, body
            )));
        }

        let token: ImdsTokenResponse = response.json().await.map_err(|e| {
            VideoIndexerError::Credential(format!("invalid metadata token response: {}", e))
        })?;

        let expires_on: u64 = token.expires_on.parse().map_err(|e| {
            VideoIndexerError::Credential(format!("invalid expires_on value: {}", e))
        })?;

        let remaining = expires_on.saturating_sub(chrono::Utc::now().timestamp() as u64);

        Ok(AccessToken::new(
            token.access_token,
            Instant::now() + Duration::from_secs(remaining),
        ))
    }
}

#[async_trait]
impl TokenCredential for ImdsCredential {
    async fn get_token(&self, scope: &str, cancel: &CancellationToken) -> Result<AccessToken> {
        cancellable(cancel, self.request_token(scope)).await
    }

    fn name(&self) -> &'static str {
        "managed-identity"
    }
}
