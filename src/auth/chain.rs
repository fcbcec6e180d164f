//! Ambient credential chain
//!
//! Tries identity sources in order until one produces a token: the process
//! environment, the instance metadata service, then the Azure CLI. Used
//! when no explicit application secret is configured.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{
    AccessToken, AzureCliCredential, ClientSecretCredential, ImdsCredential, TokenCredential,
};
use crate::error::{Result, VideoIndexerError};

/// A credential that reads an application secret from the process
/// environment at token-request time (AZURE_TENANT_ID, AZURE_CLIENT_ID,
/// AZURE_CLIENT_SECRET).
pub struct EnvironmentCredential {
    http: reqwest::Client,
    authority: String,
    /// Configured tenant; overrides AZURE_TENANT_ID when present
    tenant_id: Option<String>,
}

impl EnvironmentCredential {
    pub fn new(http: reqwest::Client, authority: String, tenant_id: Option<String>) -> Self {
        Self {
            http,
            authority,
            tenant_id,
        }
    }
}

impl std::fmt::Debug for EnvironmentCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentCredential")
            .field("authority", &self.authority)
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

#[async_trait]
impl TokenCredential for EnvironmentCredential {
    async fn get_token(&self, scope: &str, cancel: &CancellationToken) -> Result<AccessToken> {
        let client_id = std::env::var("AZURE_CLIENT_ID").ok().filter(|v| !v.is_empty());
        let client_secret = std::env::var("AZURE_CLIENT_SECRET")
            .ok()
            .filter(|v| !v.is_empty());

        let (Some(client_id), Some(client_secret)) = (client_id, client_secret) else {
            return Err(VideoIndexerError::Credential(
                "AZURE_CLIENT_ID and AZURE_CLIENT_SECRET are not both set".to_string(),
            ));
        };

        let tenant_id = self
            .tenant_id
            .clone()
            .or_else(|| std::env::var("AZURE_TENANT_ID").ok().filter(|v| !v.is_empty()));

        let delegate = ClientSecretCredential::new(
            self.http.clone(),
            self.authority.clone(),
            tenant_id,
            client_id,
            client_secret,
        );
        delegate.get_token(scope, cancel).await
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}

/// An ordered list of credential strategies tried until one succeeds.
pub struct ChainedCredential {
    strategies: Vec<Box<dyn TokenCredential>>,
    tenant_id: Option<String>,
}

impl ChainedCredential {
    /// The default ambient chain: environment, managed identity, Azure CLI.
    ///
    /// A configured tenant pins the environment and CLI strategies; the
    /// metadata service does not support pinning and is left at its
    /// default. `client_id` selects a user-assigned managed identity.
    pub fn ambient(
        http: reqwest::Client,
        authority: String,
        tenant_id: Option<String>,
        client_id: Option<String>,
    ) -> Self {
        let strategies: Vec<Box<dyn TokenCredential>> = vec![
            Box::new(EnvironmentCredential::new(
                http.clone(),
                authority,
                tenant_id.clone(),
            )),
            Box::new(ImdsCredential::new(http, client_id)),
            Box::new(AzureCliCredential::new(tenant_id.clone())),
        ];

        Self {
            strategies,
            tenant_id,
        }
    }

    /// Build a chain from explicit strategies, in the order they are tried.
    pub fn new(strategies: Vec<Box<dyn TokenCredential>>, tenant_id: Option<String>) -> Self {
        Self {
            strategies,
            tenant_id,
        }
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// Try each strategy in order, returning the first token produced.
    ///
    /// Cancellation propagates immediately; other failures are collected
    /// and reported together when the chain is exhausted.
    pub async fn get_token(&self, scope: &str, cancel: &CancellationToken) -> Result<AccessToken> {
        let mut failures = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            match strategy.get_token(scope, cancel).await {
                Ok(token) => {
                    debug!(strategy = strategy.name(), "ambient credential produced a token");
                    return Ok(token);
                }
                Err(VideoIndexerError::Cancelled) => return Err(VideoIndexerError::Cancelled),
                Err(e) => {
                    debug!(strategy = strategy.name(), error = %e, "ambient credential strategy failed");
                    failures.push(format!("{}: {}", strategy.name(), e));
                }
            }
        }

        Err(VideoIndexerError::Credential(format!(
            "no credential in the ambient chain produced a token: {}",
            failures.join("; ")
        )))
    }
}

impl std::fmt::Debug for ChainedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("ChainedCredential")
            .field("strategies", &names)
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}
