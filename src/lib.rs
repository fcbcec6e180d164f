//! video-indexer-client: a client library for a cloud video-indexing service
//!
//! The heart of this crate is the access-token broker: it selects a
//! credential strategy, obtains a management-plane token from the identity
//! provider, exchanges it for a service-scoped token against the
//! video-indexing control plane, and narrows that token to a specific
//! permission and resource scope.
//!
//! # Architecture
//!
//! - **Credential layer**: an explicit application secret or an ambient
//!   chain (environment, managed identity, CLI), selected once from
//!   configuration and used through the `TokenCredential` trait.
//! - **Token broker**: the management-token acquirer, the control-plane
//!   token exchanger, and the resource-scoped data-plane accessors.
//! - **Cache layer**: optional decorator that reuses issued tokens within
//!   a fixed TTL and coalesces concurrent requests per key.
//! - **Client**: ties configuration, credential, and broker together
//!   behind the repository-facing `VideoIndexerClient`.
//!
//! # Example
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use video_indexer_client::config::Config;
//! use video_indexer_client::token::{PermissionLevel, TokenScope};
//! use video_indexer_client::VideoIndexerClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_file(&"config.yaml".into())?;
//! let client = VideoIndexerClient::new(config)?;
//!
//! let cancel = CancellationToken::new();
//! let token = client
//!     .generate_access_token(PermissionLevel::Contributor, TokenScope::Account, &cancel)
//!     .await?;
//! // Attach as `Authorization: Bearer <token>` on data-plane requests
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod env;
pub mod error;
pub mod token;

pub use client::VideoIndexerClient;
pub use error::{Result, VideoIndexerError};
