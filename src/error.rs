use reqwest::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for video-indexer-client operations
#[derive(Error, Debug)]
pub enum VideoIndexerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Control plane returned no account descriptor")]
    MissingAccount,

    #[error("Account {account} has no location")]
    MissingLocation { account: String },

    #[error("Account {account} has no account id")]
    MissingAccountId { account: String },

    #[error("Credential failed to produce a token: {0}")]
    Credential(String),

    #[error("Service returned HTTP {status}: {body}")]
    ExchangeHttp { status: StatusCode, body: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected token response: {0}")]
    Parsing(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias for video-indexer-client operations
pub type Result<T> = std::result::Result<T, VideoIndexerError>;
