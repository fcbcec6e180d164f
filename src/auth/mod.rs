//! Credential strategies for the cloud identity provider
//!
//! This module resolves process configuration into a credential and turns
//! that credential into management-plane bearer tokens. Two mutually
//! exclusive paths exist:
//! - An explicit application secret (tenant id, client id, client secret)
//! - An ambient chain that tries the environment, the instance metadata
//!   service, and the Azure CLI in order
//!
//! Resolution is pure configuration interpretation; no network I/O happens
//! until a token is actually requested.

pub mod chain;
pub mod cli;
pub mod imds;
pub mod management;
pub mod secret;

use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{AuthConfig, ConfigError};
use crate::error::{Result, VideoIndexerError};

pub use chain::{ChainedCredential, EnvironmentCredential};
pub use cli::AzureCliCredential;
pub use imds::ImdsCredential;
pub use secret::ClientSecretCredential;

/// A bearer token issued by the identity provider, with its expiry.
///
/// Owned exclusively by the caller that requested it; never persisted.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_on: Instant,
}

impl AccessToken {
    pub fn new(secret: String, expires_on: Instant) -> Self {
        Self { secret, expires_on }
    }

    /// The raw bearer token value. Attach verbatim as a bearer credential;
    /// never log it.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// When the token stops being valid
    pub fn expires_on(&self) -> Instant {
        self.expires_on
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[redacted]")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Interface every credential strategy implements.
///
/// `scope` is the requested audience in OAuth2 v2.0 form
/// (e.g. `https://management.azure.com/.default`).
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Request a token for the given scope.
    async fn get_token(&self, scope: &str, cancel: &CancellationToken) -> Result<AccessToken>;

    /// Short strategy name, used in chain failure reports.
    fn name(&self) -> &'static str;
}

/// Resolved credential: an explicit application secret or an ambient chain.
///
/// Selected once from configuration; callers match on it nowhere else.
pub enum Credential {
    ClientSecret(ClientSecretCredential),
    Chain(ChainedCredential),
}

impl Credential {
    /// Request a token for the given scope from the underlying strategy.
    pub async fn get_token(&self, scope: &str, cancel: &CancellationToken) -> Result<AccessToken> {
        match self {
            Credential::ClientSecret(credential) => credential.get_token(scope, cancel).await,
            Credential::Chain(credential) => credential.get_token(scope, cancel).await,
        }
    }

    /// Stable identity string for cache keying. Never contains the secret.
    pub fn identity(&self) -> String {
        match self {
            Credential::ClientSecret(credential) => format!(
                "secret/{}/{}",
                credential.tenant_id().unwrap_or("organizations"),
                credential.client_id()
            ),
            Credential::Chain(credential) => format!(
                "chain/{}",
                credential.tenant_id().unwrap_or("default")
            ),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ClientSecret(credential) => {
                f.debug_tuple("ClientSecret").field(credential).finish()
            }
            Credential::Chain(credential) => f.debug_tuple("Chain").field(credential).finish(),
        }
    }
}

/// Choose the credential strategy from configuration.
///
/// - client id and client secret both present: explicit secret credential,
///   optionally pinned to the configured tenant.
/// - client secret present without a client id: configuration error,
///   surfaced here rather than deferred to the first network call.
/// - otherwise: the ambient chain, with every sub-strategy that supports
///   tenant pinning pinned to the configured tenant. A configured client id
///   without a secret is passed to the chain as the user-assigned managed
///   identity hint.
pub fn resolve_credential(
    auth: &AuthConfig,
    authority: &str,
    http: reqwest::Client,
) -> Result<Credential> {
    match (&auth.client_id, &auth.client_secret) {
        (Some(client_id), Some(client_secret)) => {
            Ok(Credential::ClientSecret(ClientSecretCredential::new(
                http,
                authority.to_string(),
                auth.tenant_id.clone(),
                client_id.clone(),
                client_secret.clone(),
            )))
        }
        (None, Some(_)) => Err(ConfigError::ValidationError(
            "client_secret is set but client_id is missing".to_string(),
        )
        .into()),
        (client_id, None) => Ok(Credential::Chain(ChainedCredential::ambient(
            http,
            authority.to_string(),
            auth.tenant_id.clone(),
            client_id.clone(),
        ))),
    }
}

/// Race a network future against the caller's cancellation signal.
///
/// Dropping the future aborts the in-flight request; the caller observes
/// `Cancelled` rather than a result.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(VideoIndexerError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(
        tenant_id: Option<&str>,
        client_id: Option<&str>,
        client_secret: Option<&str>,
    ) -> AuthConfig {
        AuthConfig {
            tenant_id: tenant_id.map(String::from),
            client_id: client_id.map(String::from),
            client_secret: client_secret.map(String::from),
        }
    }

    #[test]
    fn test_resolve_secret_credential() {
        let credential = resolve_credential(
            &auth(Some("tenant-1"), Some("app-1"), Some("s3cret")),
            "https://login.microsoftonline.com",
            reqwest::Client::new(),
        )
        .unwrap();

        assert!(matches!(credential, Credential::ClientSecret(_)));
        assert_eq!(credential.identity(), "secret/tenant-1/app-1");
    }

    #[test]
    fn test_resolve_secret_credential_without_tenant() {
        let credential = resolve_credential(
            &auth(None, Some("app-1"), Some("s3cret")),
            "https://login.microsoftonline.com",
            reqwest::Client::new(),
        )
        .unwrap();

        assert!(matches!(credential, Credential::ClientSecret(_)));
        assert_eq!(credential.identity(), "secret/organizations/app-1");
    }

    #[test]
    fn test_resolve_ambient_chain_when_secret_absent() {
        for config in [
            auth(None, None, None),
            auth(Some("tenant-1"), None, None),
            // A lone client id selects the chain (user-assigned identity hint)
            auth(None, Some("app-1"), None),
        ] {
            let credential = resolve_credential(
                &config,
                "https://login.microsoftonline.com",
                reqwest::Client::new(),
            )
            .unwrap();
            assert!(matches!(credential, Credential::Chain(_)));
        }
    }

    #[test]
    fn test_resolve_rejects_secret_without_client_id() {
        let err = resolve_credential(
            &auth(Some("tenant-1"), None, Some("s3cret")),
            "https://login.microsoftonline.com",
            reqwest::Client::new(),
        )
        .unwrap_err();

        assert!(matches!(err, VideoIndexerError::Config(_)));
    }

    #[test]
    fn test_access_token_debug_redacts_secret() {
        let token = AccessToken::new("top-secret".to_string(), Instant::now());
        let rendered = format!("{:?}", token);
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("[redacted]"));
    }

    #[tokio::test]
    async fn test_cancellable_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = cancellable(&cancel, async { Ok(42) }).await;
        assert!(matches!(result, Err(VideoIndexerError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancellable_passes_result_through() {
        let cancel = CancellationToken::new();
        let result = cancellable(&cancel, async { Ok(42) }).await.unwrap();
        assert_eq!(result, 42);
    }
}
