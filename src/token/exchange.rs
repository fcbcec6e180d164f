//! Account token exchange against the control plane
//!
//! Presents a management-plane token to the account's `generateAccessToken`
//! endpoint and returns the issued service-scoped token. Exactly one
//! outbound request per invocation; no retry, no caching.

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::auth::{cancellable, AccessToken};
use crate::config::Config;
use crate::error::{Result, VideoIndexerError};
use crate::token::ExchangeRequest;

/// Successful response from the token-issuance endpoints
#[derive(Debug, Deserialize)]
struct TokenEnvelope {
    #[serde(rename = "accessToken")]
    access_token: String,
}

/// Exchanges management-plane tokens for account-scoped tokens.
pub struct ServiceTokenExchanger {
    http: reqwest::Client,
    management_root: String,
    subscription_id: String,
    resource_group: String,
    provider: String,
    account_name: String,
    api_version: String,
}

impl ServiceTokenExchanger {
    pub fn from_config(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            management_root: config.endpoints.management_root.clone(),
            subscription_id: config.account.subscription_id.clone(),
            resource_group: config.account.resource_group.clone(),
            provider: config.endpoints.provider.clone(),
            account_name: config.account.name.clone(),
            api_version: config.endpoints.api_version.clone(),
        }
    }

    /// Control-plane URL of the account resource itself, with the
    /// api-version query applied.
    pub fn account_url(&self) -> Result<Url> {
        let mut url = self.account_base_url()?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    fn account_base_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.management_root).map_err(|e| {
            VideoIndexerError::InvalidArgument(format!("invalid management root URL: {}", e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                VideoIndexerError::InvalidArgument(
                    "management root URL cannot be a base".to_string(),
                )
            })?
            .extend([
                "subscriptions",
                self.subscription_id.as_str(),
                "resourcegroups",
                self.resource_group.as_str(),
                "providers",
                self.provider.as_str(),
                "accounts",
                self.account_name.as_str(),
            ]);

        Ok(url)
    }

    fn generate_token_url(&self) -> Result<Url> {
        let mut url = self.account_base_url()?;
        url.path_segments_mut()
            .map_err(|_| {
                VideoIndexerError::InvalidArgument(
                    "management root URL cannot be a base".to_string(),
                )
            })?
            .push("generateAccessToken");
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    /// Exchange a management token for an account token carrying the
    /// requested permission level and scope.
    pub async fn exchange_for_account_token(
        &self,
        management_token: &AccessToken,
        request: &ExchangeRequest,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let url = self.generate_token_url()?;
        cancellable(cancel, self.post_exchange(url, management_token, request)).await
    }

    async fn post_exchange(
        &self,
        url: Url,
        management_token: &AccessToken,
        request: &ExchangeRequest,
    ) -> Result<String> {
        debug!(
            account = %self.account_name,
            permission = %request.permission,
            scope = %request.scope,
            "exchanging management token for account token"
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(management_token.secret())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VideoIndexerError::ExchangeHttp { status, body });
        }

        let body = response.text().await?;
        let envelope: TokenEnvelope = serde_json::from_str(&body).map_err(|e| {
            VideoIndexerError::Parsing(format!(
                "exchange response did not contain an accessToken field: {}",
                e
            ))
        })?;

        if envelope.access_token.is_empty() {
            return Err(VideoIndexerError::Parsing(
                "exchange response contained an empty accessToken".to_string(),
            ));
        }

        Ok(envelope.access_token)
    }
}
