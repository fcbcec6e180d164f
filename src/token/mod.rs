//! Access-token request types shared by the exchange and accessor paths
//!
//! Permission levels and token scopes are closed enumerations with an
//! explicit string table. Parsing is exact-match only so that near-miss
//! values ("reader", "OWNER") are rejected before any request is built.

pub mod accessors;
pub mod exchange;

use serde::{Serialize, Serializer};

use crate::error::{Result, VideoIndexerError};

pub use accessors::{ScopedTokenClient, TokenResource};
pub use exchange::ServiceTokenExchanger;

/// Authority granted by an issued token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PermissionLevel {
    Reader,
    #[default]
    Contributor,
    AccessAdministrator,
    Owner,
}

impl PermissionLevel {
    /// Wire name of the permission level
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Reader => "Reader",
            PermissionLevel::Contributor => "Contributor",
            PermissionLevel::AccessAdministrator => "AccessAdministrator",
            PermissionLevel::Owner => "Owner",
        }
    }

    /// Parse a wire name. Exact match only.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "Reader" => Ok(PermissionLevel::Reader),
            "Contributor" => Ok(PermissionLevel::Contributor),
            "AccessAdministrator" => Ok(PermissionLevel::AccessAdministrator),
            "Owner" => Ok(PermissionLevel::Owner),
            other => Err(VideoIndexerError::InvalidArgument(format!(
                "unknown permission level: {:?}",
                other
            ))),
        }
    }
}

impl Serialize for PermissionLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Granularity an issued token is valid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenScope {
    #[default]
    Account,
    Project,
    Video,
}

impl TokenScope {
    /// Wire name of the scope
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Account => "Account",
            TokenScope::Project => "Project",
            TokenScope::Video => "Video",
        }
    }

    /// Parse a wire name. Exact match only.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "Account" => Ok(TokenScope::Account),
            "Project" => Ok(TokenScope::Project),
            "Video" => Ok(TokenScope::Video),
            other => Err(VideoIndexerError::InvalidArgument(format!(
                "unknown token scope: {:?}",
                other
            ))),
        }
    }
}

impl Serialize for TokenScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for TokenScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of the control-plane token exchange request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExchangeRequest {
    #[serde(rename = "permissionType")]
    pub permission: PermissionLevel,
    pub scope: TokenScope,
}

impl ExchangeRequest {
    pub fn new(permission: PermissionLevel, scope: TokenScope) -> Self {
        Self { permission, scope }
    }

    /// Build a request from free-form values, rejecting anything outside
    /// the closed enumerations before any network call is made.
    pub fn from_parts(permission: &str, scope: &str) -> Result<Self> {
        Ok(Self {
            permission: PermissionLevel::parse(permission)?,
            scope: TokenScope::parse(scope)?,
        })
    }
}

impl Default for ExchangeRequest {
    fn default() -> Self {
        Self::new(PermissionLevel::default(), TokenScope::default())
    }
}

/// Optional parameters shared by the resource-scoped token accessors
#[derive(Debug, Clone, Default)]
pub struct AccessTokenOptions {
    /// Request a token that permits write operations
    pub allow_edit: Option<bool>,

    /// Client-supplied identifier for request correlation
    pub client_request_id: Option<String>,
}
