//! Control-plane account descriptor and context validation
//!
//! Every higher-level operation that needs an account passes through
//! `AccountContext::from_account`, the single enforcement point for the
//! invariant that no operation proceeds against an incomplete account.

use serde::Deserialize;
use tracing::error;

use crate::error::{Result, VideoIndexerError};

/// Account descriptor as returned by a control-plane account lookup
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account name
    pub name: Option<String>,

    /// Region the account is deployed in
    pub location: Option<String>,

    /// Provider-specific properties
    pub properties: Option<AccountProperties>,
}

/// Provider-specific account properties
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProperties {
    /// Unique account identifier used by the data plane
    pub account_id: Option<String>,
}

/// Validated account coordinates: a non-empty location and account id.
///
/// The fields are private so a context can only be obtained through
/// validation; lifetime is one logical operation, it is never cached
/// across calls because account state can change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    location: String,
    account_id: String,
}

impl AccountContext {
    /// Build a context from explicit values, enforcing the non-empty invariant.
    pub fn new(location: impl Into<String>, account_id: impl Into<String>) -> Result<Self> {
        let location = location.into();
        let account_id = account_id.into();

        if location.is_empty() {
            return Err(VideoIndexerError::InvalidArgument(
                "location cannot be empty".to_string(),
            ));
        }
        if account_id.is_empty() {
            return Err(VideoIndexerError::InvalidArgument(
                "account_id cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            location,
            account_id,
        })
    }

    /// Validate a control-plane account descriptor into a context.
    ///
    /// Fails with `MissingAccount` when no descriptor was returned,
    /// `MissingLocation` when the location is absent or empty, and
    /// `MissingAccountId` when the nested account id is absent or empty.
    pub fn from_account(account: Option<&Account>) -> Result<Self> {
        let Some(account) = account else {
            error!("control plane returned no account descriptor");
            return Err(VideoIndexerError::MissingAccount);
        };

        let name = account.name.clone().unwrap_or_else(|| "<unnamed>".to_string());

        let location = match account.location.as_deref() {
            Some(location) if !location.is_empty() => location.to_string(),
            _ => {
                error!(account = %name, "account descriptor has no location");
                return Err(VideoIndexerError::MissingLocation { account: name });
            }
        };

        let account_id = match account
            .properties
            .as_ref()
            .and_then(|p| p.account_id.as_deref())
        {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                error!(account = %name, "account descriptor has no account id");
                return Err(VideoIndexerError::MissingAccountId { account: name });
            }
        };

        Ok(Self {
            location,
            account_id,
        })
    }

    /// Region the account is deployed in
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Unique account identifier used by the data plane
    pub fn account_id(&self) -> &str {
        &self.account_id
    }
}
