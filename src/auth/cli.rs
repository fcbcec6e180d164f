//! Azure CLI credential
//!
//! Last strategy in the ambient chain: shells out to `az account
//! get-access-token`, which serves tokens from the CLI's shared token
//! cache and handles interactive login out of band. Supports tenant
//! pinning via `--tenant`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{cancellable, AccessToken, TokenCredential};
use crate::error::{Result, VideoIndexerError};

/// Response from `az account get-access-token`
#[derive(Debug, Deserialize)]
struct CliTokenResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
    /// Token expiry as a Unix timestamp
    #[serde(rename = "expires_on")]
    expires_on: u64,
}

/// A credential backed by the logged-in Azure CLI session.
#[derive(Debug)]
pub struct AzureCliCredential {
    tenant_id: Option<String>,
}

impl AzureCliCredential {
    pub fn new(tenant_id: Option<String>) -> Self {
        Self { tenant_id }
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken> {
        // The CLI takes the bare resource, not a v2.0 scope
        let resource = scope.trim_end_matches("/.default").to_string();

        let mut command = tokio::process::Command::new("az");
        command.args(["account", "get-access-token", "--resource", &resource]);
        if let Some(tenant_id) = &self.tenant_id {
            command.args(["--tenant", tenant_id]);
        }
        command.kill_on_drop(true);

        debug!("requesting token from the Azure CLI");

        let output = command.output().await.map_err(|e| {
            VideoIndexerError::Credential(format!("failed to execute the Azure CLI: {}", e))
        })?;

        if !output.status.success() {
            return Err(VideoIndexerError::Credential(format!(
                "Azure CLI exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let token: CliTokenResponse = serde_json::from_slice(&output.stdout).map_err(|e| {
            VideoIndexerError::Credential(format!("invalid CLI token response: {}", e))
        })?;

        let remaining = token
            .expires_on
            .saturating_sub(chrono::Utc::now().timestamp() as u64);

        Ok(AccessToken::new(
            token.access_token,
            Instant::now() + Duration::from_secs(remaining),
        ))
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    async fn get_token(&self, scope: &str, cancel: &CancellationToken) -> Result<AccessToken> {
        cancellable(cancel, self.request_token(scope)).await
    }

    fn name(&self) -> &'static str {
        "azure-cli"
    }
}
