//! Resource-scoped access-token requests against the data plane
//!
//! Thin callers over the service's `/auth` endpoints, parameterized by a
//! validated account context, an optional edit flag, and an optional
//! correlation id. The accessors share the broker's failure taxonomy and
//! perform no retries of their own.

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::account::AccountContext;
use crate::auth::{cancellable, AccessToken};
use crate::error::{Result, VideoIndexerError};
use crate::token::AccessTokenOptions;

/// The resource a data-plane token is narrowed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenResource {
    /// The whole account
    Account,
    /// A single project
    Project(String),
    /// A single video
    Video(String),
    /// The calling user
    User,
}

impl TokenResource {
    /// Scope label used in logs and cache keys
    pub fn scope_label(&self) -> &'static str {
        match self {
            TokenResource::Account => "Account",
            TokenResource::Project(_) => "Project",
            TokenResource::Video(_) => "Video",
            TokenResource::User => "User",
        }
    }

    /// Identifier of the narrowed resource, when there is one
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            TokenResource::Project(id) | TokenResource::Video(id) => Some(id),
            TokenResource::Account | TokenResource::User => None,
        }
    }
}

/// Token responses arrive either as a bare JSON string (the service's
/// historical shape) or wrapped in an accessToken envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScopedTokenResponse {
    Envelope {
        #[serde(rename = "accessToken")]
        access_token: String,
    },
    Bare(String),
}

impl ScopedTokenResponse {
    fn into_token(self) -> String {
        match self {
            ScopedTokenResponse::Envelope { access_token } => access_token,
            ScopedTokenResponse::Bare(token) => token,
        }
    }
}

/// Requests resource-scoped tokens from the data plane.
pub struct ScopedTokenClient {
    http: reqwest::Client,
    data_plane_root: String,
}

impl ScopedTokenClient {
    pub fn new(http: reqwest::Client, data_plane_root: String) -> Self {
        Self {
            http,
            data_plane_root,
        }
    }

    fn endpoint(
        &self,
        context: &AccountContext,
        resource: &TokenResource,
        options: &AccessTokenOptions,
    ) -> Result<Url> {
        let mut url = Url::parse(&self.data_plane_root).map_err(|e| {
            VideoIndexerError::InvalidArgument(format!("invalid data plane root URL: {}", e))
        })?;

        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                VideoIndexerError::InvalidArgument(
                    "data plane root URL cannot be a base".to_string(),
                )
            })?;

            segments.extend(["auth", context.location()]);
            match resource {
                TokenResource::Account => {
                    segments.extend(["Accounts", context.account_id(), "AccessToken"]);
                }
                TokenResource::Project(project_id) => {
                    segments.extend([
                        "Accounts",
                        context.account_id(),
                        "Projects",
                        project_id.as_str(),
                        "AccessToken",
                    ]);
                }
                TokenResource::Video(video_id) => {
                    segments.extend([
                        "Accounts",
                        context.account_id(),
                        "Videos",
                        video_id.as_str(),
                        "AccessToken",
                    ]);
                }
                TokenResource::User => {
                    segments.extend(["Users", "Me", "AccessToken"]);
                }
            }
        }

        {
            let mut query = url.query_pairs_mut();
            if let Some(allow_edit) = options.allow_edit {
                query.append_pair("allowEdit", if allow_edit { "true" } else { "false" });
            }
            if let Some(client_request_id) = &options.client_request_id {
                query.append_pair("clientRequestId", client_request_id);
            }
        }

        Ok(url)
    }

    /// Request a token narrowed to the given resource.
    pub async fn get_access_token(
        &self,
        context: &AccountContext,
        resource: &TokenResource,
        options: &AccessTokenOptions,
        management_token: &AccessToken,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let url = self.endpoint(context, resource, options)?;
        cancellable(
            cancel,
            self.fetch(url, context, resource, management_token),
        )
        .await
    }

    async fn fetch(
        &self,
        url: Url,
        context: &AccountContext,
        resource: &TokenResource,
        management_token: &AccessToken,
    ) -> Result<String> {
        debug!(
            location = context.location(),
            account_id = context.account_id(),
            scope = resource.scope_label(),
            resource_id = resource.resource_id().unwrap_or(""),
            "requesting resource-scoped token"
        );

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
        let parsed: ScopedTokenResponse = serde_json::from_str(&body).map_err(|e| {
            VideoIndexerError::Parsing(format!("token response was not a token: {}", e))
        })?;

        let token = parsed.into_token();
        if token.is_empty() {
            return Err(VideoIndexerError::Parsing(
                "token response contained an empty token".to_string(),
            ));
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context() -> AccountContext {
        AccountContext::new("eastus", "acct-123").unwrap()
    }

    fn management_token() -> AccessToken {
        AccessToken::new("mgmt-token".to_string(), Instant::now())
    }

    #[test]
    fn test_endpoint_shapes() {
        let client = ScopedTokenClient::new(
            reqwest::Client::new(),
            "https://api.videoindexer.ai".to_string(),
        );
        let options = AccessTokenOptions::default();

        let cases = [
            (
                TokenResource::Account,
                "https://api.videoindexer.ai/auth/eastus/Accounts/acct-123/AccessToken",
            ),
            (
                TokenResource::Project("proj-9".to_string()),
                "https://api.videoindexer.ai/auth/eastus/Accounts/acct-123/Projects/proj-9/AccessToken",
            ),
            (
                TokenResource::Video("vid-7".to_string()),
                "https://api.videoindexer.ai/auth/eastus/Accounts/acct-123/Videos/vid-7/AccessToken",
            ),
            (
                TokenResource::User,
                "https://api.videoindexer.ai/auth/eastus/Users/Me/AccessToken",
            ),
        ];

        for (resource, expected) in cases {
            let url = client.endpoint(&context(), &resource, &options).unwrap();
            assert_eq!(url.as_str(), expected);
        }
    }

    #[test]
    fn test_endpoint_query_flags() {
        let client = ScopedTokenClient::new(
            reqwest::Client::new(),
            "https://api.videoindexer.ai".to_string(),
        );
        let options = AccessTokenOptions {
            allow_edit: Some(true),
            client_request_id: Some("trace-1".to_string()),
        };

        let url = client
            .endpoint(&context(), &TokenResource::Account, &options)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.videoindexer.ai/auth/eastus/Accounts/acct-123/AccessToken?allowEdit=true&clientRequestId=trace-1"
        );
    }

    #[tokio::test]
    async fn test_video_token_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/eastus/Accounts/acct-123/Videos/vid-7/AccessToken"))
            .and(query_param("allowEdit", "false"))
            .and(header("authorization", "Bearer mgmt-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "accessToken": "video-token"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ScopedTokenClient::new(reqwest::Client::new(), server.uri());
        let options = AccessTokenOptions {
            allow_edit: Some(false),
            client_request_id: None,
        };
        let cancel = CancellationToken::new();
        let token = client
            .get_access_token(
                &context(),
                &TokenResource::Video("vid-7".to_string()),
                &options,
                &management_token(),
                &cancel,
            )
            .await
            .unwrap();

        assert_eq!(token, "video-token");
    }

    #[tokio::test]
    async fn test_bare_string_response_accepted() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!("bare-token")))
            .mount(&server)
            .await;

        let client = ScopedTokenClient::new(reqwest::Client::new(), server.uri());
        let cancel = CancellationToken::new();
        let token = client
            .get_access_token(
                &context(),
                &TokenResource::Account,
                &AccessTokenOptions::default(),
                &management_token(),
                &cancel,
            )
            .await
            .unwrap();

        assert_eq!(token, "bare-token");
    }

    #[tokio::test]
    async fn test_non_success_status_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .mount(&server)
            .await;

        let client = ScopedTokenClient::new(reqwest::Client::new(), server.uri());
        let cancel = CancellationToken::new();
        let err = client
            .get_access_token(
                &context(),
                &TokenResource::User,
                &AccessTokenOptions::default(),
                &management_token(),
                &cancel,
            )
            .await
            .unwrap_err();

        match err {
            VideoIndexerError::ExchangeHttp { status, body } => {
                assert_eq!(status.as_u16(), 401);
                assert_eq!(body, "token expired");
            }
            other => panic!("expected ExchangeHttp error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_token_response_is_parsing_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(42)))
            .mount(&server)
            .await;

        let client = ScopedTokenClient::new(reqwest::Client::new(), server.uri());
        let cancel = CancellationToken::new();
        let err = client
            .get_access_token(
                &context(),
                &TokenResource::Account,
                &AccessTokenOptions::default(),
                &management_token(),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, VideoIndexerError::Parsing(_)));
    }
}
