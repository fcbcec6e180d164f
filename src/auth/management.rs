//! Management-plane token acquisition
//!
//! Turns a resolved credential into a bearer token scoped to the resource
//! management API. Failures are surfaced unchanged; retries, if desired,
//! belong to the caller. The token value is never logged.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{AccessToken, Credential};
use crate::error::{Result, VideoIndexerError};

/// Build the management-plane audience in OAuth2 v2.0 scope form.
pub fn management_scope(management_root: &str) -> String {
    if management_root.ends_with("/.default") {
        management_root.to_string()
    } else {
        format!("{}/.default", management_root.trim_end_matches('/'))
    }
}

/// Obtain a management-plane token from the resolved credential.
pub async fn get_management_token(
    credential: &Credential,
    management_root: &str,
    cancel: &CancellationToken,
) -> Result<AccessToken> {
    let scope = management_scope(management_root);
    debug!(scope = %scope, "acquiring management-plane token");
    credential.get_token(&scope, cancel).await
}

/// Blocking form of [`get_management_token`].
///
/// Spins a current-thread runtime for the duration of the call; returns
/// `InvalidArgument` when invoked from within an async runtime, where the
/// non-blocking form must be used instead.
pub fn get_management_token_blocking(
    credential: &Credential,
    management_root: &str,
    cancel: &CancellationToken,
) -> Result<AccessToken> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(VideoIndexerError::InvalidArgument(
            "get_management_token_blocking called from within an async runtime".to_string(),
        ));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            VideoIndexerError::Credential(format!("failed to start blocking runtime: {}", e))
        })?;

    runtime.block_on(get_management_token(credential, management_root, cancel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ClientSecretCredential;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_management_scope() {
        assert_eq!(
            management_scope("https://management.azure.com"),
            "https://management.azure.com/.default"
        );
        assert_eq!(
            management_scope("https://management.azure.com/"),
            "https://management.azure.com/.default"
        );
        // Already-scoped input is left alone
        assert_eq!(
            management_scope("https://management.azure.com/.default"),
            "https://management.azure.com/.default"
        );
    }

    fn secret_credential(authority: String) -> Credential {
        Credential::ClientSecret(ClientSecretCredential::new(
            reqwest::Client::new(),
            authority,
            Some("tenant-1".to_string()),
            "app-1".to_string(),
            "s3cret".to_string(),
        ))
    }

    async fn mount_token_endpoint(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .and(body_string_contains("scope=https%3A%2F%2Farm.example.com%2F.default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "mgmt-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_get_management_token() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;

        let credential = secret_credential(server.uri());
        let cancel = CancellationToken::new();
        let token = get_management_token(&credential, "https://arm.example.com", &cancel)
            .await
            .unwrap();

        assert_eq!(token.secret(), "mgmt-token");
    }

    #[tokio::test]
    async fn test_blocking_form_rejected_inside_runtime() {
        let credential = secret_credential("https://login.example.com".to_string());
        let cancel = CancellationToken::new();
        let err =
            get_management_token_blocking(&credential, "https://arm.example.com", &cancel)
                .unwrap_err();

        assert!(matches!(err, VideoIndexerError::InvalidArgument(_)));
    }

    #[test]
    fn test_blocking_form_returns_same_result() {
        // The mock server lives on a multi-thread runtime so its worker
        // keeps serving while the blocking form runs its own runtime.
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            mount_token_endpoint(&server).await;
            server
        });

        let credential = secret_credential(server.uri());
        let cancel = CancellationToken::new();
        let token =
            get_management_token_blocking(&credential, "https://arm.example.com", &cancel)
                .unwrap();

        assert_eq!(token.secret(), "mgmt-token");
        drop(runtime);
    }
}
