//! Client-secret (service principal) credential
//!
//! Performs the OAuth2 client-credentials exchange against the identity
//! provider's v2.0 token endpoint. When no tenant is configured the request
//! goes to the `organizations` authority path, deferring to the secret's
//! home tenant.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{cancellable, AccessToken, TokenCredential};
use crate::error::{Result, VideoIndexerError};

/// Response from the identity provider's OAuth2 token endpoint
#[derive(Debug, Deserialize)]
struct OAuth2TokenResponse {
    access_token: String,
    /// Token lifetime in seconds
    expires_in: u64,
}

/// A credential backed by an application client secret.
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority: String,
    tenant_id: Option<String>,
    client_id: String,
    client_secret: String,
}

impl ClientSecretCredential {
    pub fn new(
        http: reqwest::Client,
        authority: String,
        tenant_id: Option<String>,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http,
            authority,
            tenant_id,
            client_id,
            client_secret,
        }
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority,
            self.tenant_id.as_deref().unwrap_or("organizations")
        )
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];

        debug!(client_id = %self.client_id, "requesting token with client secret");

        let response = self
            .http
            .post(self.token_url())
            .form(&params)
            .send()
            .await
            .map_err(|e| VideoIndexerError::Credential(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VideoIndexerError::Credential(format!(
                "identity provider returned {}: {}",
                status, body
            )));
        }

        let token: OAuth2TokenResponse = response.json().await.map_err(|e| {
            VideoIndexerError::Credential(format!("invalid token response: {}", e))
        })?;

        Ok(AccessToken::new(
            token.access_token,
            Instant::now() + Duration::from_secs(token.expires_in),
        ))
    }
}

impl std::fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("authority", &self.authority)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self, scope: &str, cancel: &CancellationToken) -> Result<AccessToken> {
        cancellable(cancel, self.request_token(scope)).await
    }

    fn name(&self) -> &'static str {
        "client-secret"
    }
}
