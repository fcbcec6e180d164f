//! Repository-facing client surface
//!
//! `VideoIndexerClient` owns the resolved configuration, the credential,
//! and one shared HTTP client, and exposes the account lookup and the
//! token operations higher-level repository code builds on. Every call is
//! independent; callers may run any number of them concurrently.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::account::{Account, AccountContext};
use crate::auth::management::get_management_token;
use crate::auth::{resolve_credential, AccessToken, Credential};
use crate::cache::{TokenCache, TokenCacheKey};
use crate::config::Config;
use crate::error::{Result, VideoIndexerError};
use crate::token::{
    AccessTokenOptions, ExchangeRequest, PermissionLevel, ScopedTokenClient,
    ServiceTokenExchanger, TokenResource, TokenScope,
};

/// Timeout applied to every outbound request by the shared HTTP client
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the video-indexing service's token broker and account lookup.
pub struct VideoIndexerClient {
    config: Config,
    credential: Credential,
    http: reqwest::Client,
    exchanger: ServiceTokenExchanger,
    scoped: ScopedTokenClient,
    cache: Option<TokenCache>,
}

impl VideoIndexerClient {
    /// Build a client from resolved configuration, selecting the credential
    /// strategy up front. Malformed credential configuration fails here,
    /// before any network call.
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let credential = resolve_credential(&config.auth, &config.endpoints.authority, http.clone())?;
        Self::with_credential(config, credential, http)
    }

    /// Build a client around an explicit credential.
    pub fn with_credential(
        config: Config,
        credential: Credential,
        http: reqwest::Client,
    ) -> Result<Self> {
        config.validate()?;

        let exchanger = ServiceTokenExchanger::from_config(http.clone(), &config);
        let scoped = ScopedTokenClient::new(http.clone(), config.endpoints.data_plane_root.clone());
        let cache = TokenCache::from_config(&config.cache);

        Ok(Self {
            config,
            credential,
            http,
            exchanger,
            scoped,
            cache,
        })
    }

    /// Look up the configured account on the control plane.
    pub async fn get_account(&self, cancel: &CancellationToken) -> Result<Account> {
        let management_token = self.management_token(cancel).await?;
        let url = self.exchanger.account_url()?;

        debug!(account = %self.config.account.name, "looking up account on the control plane");

        let fetch = async {
            let response = self
                .http
                .get(url)
                .bearer_auth(management_token.secret())
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(VideoIndexerError::ExchangeHttp { status, body });
            }

            let body = response.text().await?;
            serde_json::from_str::<Account>(&body).map_err(|e| {
                VideoIndexerError::Parsing(format!("account response was malformed: {}", e))
            })
        };

        crate::auth::cancellable(cancel, fetch).await
    }

    /// Look up the configured account and validate it into a context.
    pub async fn account_context(&self, cancel: &CancellationToken) -> Result<AccountContext> {
        let account = self.get_account(cancel).await?;
        AccountContext::from_account(Some(&account))
    }

    /// Exchange a management token for an account token carrying the given
    /// permission level and scope (the control-plane `generateAccessToken`
    /// operation).
    pub async fn generate_access_token(
        &self,
        permission: PermissionLevel,
        scope: TokenScope,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let request = ExchangeRequest::new(permission, scope);
        let key = TokenCacheKey {
            credential: self.credential.identity(),
            permission,
            scope: scope.as_str().to_string(),
            resource_id: None,
        };

        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_fetch(key, || self.exchange(request, cancel))
                    .await
            }
            None => self.exchange(request, cancel).await,
        }
    }

    async fn exchange(
        &self,
        request: ExchangeRequest,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let management_token = self.management_token(cancel).await?;
        self.exchanger
            .exchange_for_account_token(&management_token, &request, cancel)
            .await
    }

    /// Request a token narrowed to the whole account from the data plane.
    pub async fn get_account_token(
        &self,
        context: Option<AccountContext>,
        options: &AccessTokenOptions,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.scoped_token(context, TokenResource::Account, options, cancel)
            .await
    }

    /// Request a token narrowed to a single project.
    pub async fn get_project_token(
        &self,
        context: Option<AccountContext>,
        project_id: &str,
        options: &AccessTokenOptions,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.scoped_token(
            context,
            TokenResource::Project(project_id.to_string()),
            options,
            cancel,
        )
        .await
    }

    /// Request a token narrowed to a single video.
    pub async fn get_video_token(
        &self,
        context: Option<AccountContext>,
        video_id: &str,
        options: &AccessTokenOptions,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.scoped_token(
            context,
            TokenResource::Video(video_id.to_string()),
            options,
            cancel,
        )
        .await
    }

    /// Request a token scoped to the calling user.
    pub async fn get_user_token(
        &self,
        context: Option<AccountContext>,
        options: &AccessTokenOptions,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.scoped_token(context, TokenResource::User, options, cancel)
            .await
    }

    /// Shared path of the resource-scoped accessors: resolve and validate
    /// the account context when the caller did not supply one, then fetch
    /// the narrowed token (through the cache when enabled).
    async fn scoped_token(
        &self,
        context: Option<AccountContext>,
        resource: TokenResource,
        options: &AccessTokenOptions,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let context = match context {
            Some(context) => context,
            None => self.account_context(cancel).await?,
        };

        // Edit access maps to Contributor authority for cache keying
        let permission = if options.allow_edit.unwrap_or(false) {
            PermissionLevel::Contributor
        } else {
            PermissionLevel::Reader
        };
        let key = TokenCacheKey {
            credential: self.credential.identity(),
            permission,
            scope: resource.scope_label().to_string(),
            resource_id: resource.resource_id().map(String::from),
        };

        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_fetch(key, || {
                        self.fetch_scoped(context, resource, options, cancel)
                    })
                    .await
            }
            None => self.fetch_scoped(context, resource, options, cancel).await,
        }
    }

    async fn fetch_scoped(
        &self,
        context: AccountContext,
        resource: TokenResource,
        options: &AccessTokenOptions,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let management_token = self.management_token(cancel).await?;
        self.scoped
            .get_access_token(&context, &resource, options, &management_token, cancel)
            .await
    }

    async fn management_token(&self, cancel: &CancellationToken) -> Result<AccessToken> {
        get_management_token(
            &self.credential,
            &self.config.endpoints.management_root,
            cancel,
        )
        .await
    }
}
