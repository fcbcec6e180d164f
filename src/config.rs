//! Configuration parsing and structures

use std::path::PathBuf;

use serde::Deserialize;
use url::Url;

use crate::cache::TokenCacheConfig;
use crate::env::substitute_env_vars;

/// Default control-plane (resource management) root URL
pub const DEFAULT_MANAGEMENT_ROOT: &str = "https://management.azure.com";

/// Default identity provider authority URL
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Default data-plane root URL for the video-indexing service
pub const DEFAULT_DATA_PLANE_ROOT: &str = "https://api.videoindexer.ai";

/// Default control-plane API version
pub const DEFAULT_API_VERSION: &str = "2024-01-01";

/// Default resource provider namespace
pub const DEFAULT_PROVIDER: &str = "Microsoft.VideoIndexer";

// =============================================================================
// Raw Config (Deserialized from YAML)
// =============================================================================

/// Raw configuration as deserialized from YAML.
/// This is converted to `Config` via `resolve()`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Identity provider credentials (all fields optional; absence of
    /// client id/secret selects the ambient credential chain)
    #[serde(default)]
    pub azure: AzureSection,

    /// The video-indexing account the client operates against
    pub account: AccountSection,

    /// Endpoint overrides (all optional, defaults above)
    #[serde(default)]
    pub endpoints: EndpointsSection,

    /// Token cache configuration
    #[serde(default)]
    pub cache: TokenCacheConfig,
}

/// Identity provider credential settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AzureSection {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Account coordinates on the control plane
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSection {
    /// Subscription the account lives in
    pub subscription_id: String,

    /// Resource group the account lives in
    pub resource_group: String,

    /// Account name
    pub name: String,
}

/// Endpoint overrides, mainly useful for sovereign clouds and tests
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EndpointsSection {
    pub management_root: Option<String>,
    pub authority: Option<String>,
    pub data_plane_root: Option<String>,
    pub api_version: Option<String>,
    pub provider: Option<String>,
}

// =============================================================================
// Resolved Config (Ready for use)
// =============================================================================

/// Top-level configuration (resolved from RawConfig)
#[derive(Debug, Clone)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Identity provider credentials
    pub auth: AuthConfig,

    /// Account coordinates on the control plane
    pub account: AccountConfig,

    /// Fully resolved endpoints
    pub endpoints: Endpoints,

    /// Token cache configuration
    pub cache: TokenCacheConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Identity provider credential settings, read once at startup.
///
/// Empty strings are treated as absent so that `${VAR:}` substitutions in
/// the config file behave like unset variables.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Tenant to authenticate against; absent means the credential's home tenant
    pub tenant_id: Option<String>,

    /// Application (client) id
    pub client_id: Option<String>,

    /// Application client secret
    pub client_secret: Option<String>,
}

impl AuthConfig {
    /// Read the credential settings from the process environment
    /// (AZURE_TENANT_ID, AZURE_CLIENT_ID, AZURE_CLIENT_SECRET).
    pub fn from_env() -> Self {
        Self {
            tenant_id: none_if_empty(std::env::var("AZURE_TENANT_ID").ok()),
            client_id: none_if_empty(std::env::var("AZURE_CLIENT_ID").ok()),
            client_secret: none_if_empty(std::env::var("AZURE_CLIENT_SECRET").ok()),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Account coordinates on the control plane (resolved)
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

/// Fully resolved endpoint set
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub management_root: String,
    pub authority: String,
    pub data_plane_root: String,
    pub api_version: String,
    pub provider: String,
}

fn none_if_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn normalize_root(value: String) -> String {
    value.trim_end_matches('/').to_string()
}

// =============================================================================
// Resolution Logic
// =============================================================================

impl RawConfig {
    /// Resolve raw config into final config by filling endpoint defaults and
    /// normalizing empty credential values to "absent"
    pub fn resolve(self) -> Result<Config, ConfigError> {
        let RawConfig {
            logging,
            azure,
            account,
            endpoints,
            cache,
        } = self;

        Ok(Config {
            logging,
            auth: AuthConfig {
                tenant_id: none_if_empty(azure.tenant_id),
                client_id: none_if_empty(azure.client_id),
                client_secret: none_if_empty(azure.client_secret),
            },
            account: AccountConfig {
                subscription_id: account.subscription_id,
                resource_group: account.resource_group,
                name: account.name,
            },
            endpoints: Endpoints {
                management_root: normalize_root(
                    endpoints
                        .management_root
                        .unwrap_or_else(|| DEFAULT_MANAGEMENT_ROOT.to_string()),
                ),
                authority: normalize_root(
                    endpoints
                        .authority
                        .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string()),
                ),
                data_plane_root: normalize_root(
                    endpoints
                        .data_plane_root
                        .unwrap_or_else(|| DEFAULT_DATA_PLANE_ROOT.to_string()),
                ),
                api_version: endpoints
                    .api_version
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
                provider: endpoints
                    .provider
                    .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            },
            cache,
        })
    }
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// Environment variable references (`${VAR}` / `${VAR:default}`) are
    /// substituted before parsing, so secrets never live in the file itself.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.clone(), e.to_string()))?;

        let content = substitute_env_vars(&content)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        raw.resolve()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account.subscription_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "account.subscription_id cannot be empty".to_string(),
            ));
        }
        if self.account.resource_group.is_empty() {
            return Err(ConfigError::ValidationError(
                "account.resource_group cannot be empty".to_string(),
            ));
        }
        if self.account.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "account.name cannot be empty".to_string(),
            ));
        }
        if self.endpoints.api_version.is_empty() {
            return Err(ConfigError::ValidationError(
                "endpoints.api_version cannot be empty".to_string(),
            ));
        }

        for (field, value) in [
            ("endpoints.management_root", &self.endpoints.management_root),
            ("endpoints.authority", &self.endpoints.authority),
            ("endpoints.data_plane_root", &self.endpoints.data_plane_root),
        ] {
            Url::parse(value).map_err(|e| {
                ConfigError::ValidationError(format!("{} is not a valid URL: {}", field, e))
            })?;
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
account:
  subscription_id: sub-1
  resource_group: rg-1
  name: my-account
"#;

        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.account.subscription_id, "sub-1");
        assert_eq!(config.endpoints.management_root, DEFAULT_MANAGEMENT_ROOT);
        assert_eq!(config.endpoints.authority, DEFAULT_AUTHORITY);
        assert_eq!(config.endpoints.data_plane_root, DEFAULT_DATA_PLANE_ROOT);
        assert_eq!(config.endpoints.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.endpoints.provider, DEFAULT_PROVIDER);
        assert!(config.auth.client_id.is_none());
        assert!(matches!(config.cache, TokenCacheConfig::None));
        config.validate().unwrap();
    }

    #[test]
    fn test_endpoint_overrides_and_trailing_slash() {
        let yaml = r#"
logging:
  level: debug

account:
  subscription_id: sub-1
  resource_group: rg-1
  name: my-account

endpoints:
  management_root: "https://management.usgovcloudapi.net/"
  api_version: "2023-06-02-preview"
"#;

        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.endpoints.management_root,
            "https://management.usgovcloudapi.net"
        );
        assert_eq!(config.endpoints.api_version, "2023-06-02-preview");
        // Untouched endpoints keep their defaults
        assert_eq!(config.endpoints.authority, DEFAULT_AUTHORITY);
    }

    #[test]
    fn test_empty_credentials_treated_as_absent() {
        // The ${VAR:} substitution form produces empty strings when unset
        let yaml = r#"
azure:
  tenant_id: ""
  client_id: ""
  client_secret: ""

account:
  subscription_id: sub-1
  resource_group: rg-1
  name: my-account
"#;

        let config = Config::from_str(yaml).unwrap();
        assert!(config.auth.tenant_id.is_none());
        assert!(config.auth.client_id.is_none());
        assert!(config.auth.client_secret.is_none());
    }

    #[test]
    fn test_cache_config_parsing() {
        let yaml = r#"
account:
  subscription_id: sub-1
  resource_group: rg-1
  name: my-account

cache:
  type: memory
  ttl: 10m
"#;

        let config = Config::from_str(yaml).unwrap();
        match config.cache {
            TokenCacheConfig::Memory { ttl } => {
                assert_eq!(ttl, Some(std::time::Duration::from_secs(600)));
            }
            _ => panic!("Expected memory cache config"),
        }
    }

    #[test]
    fn test_missing_account_section_error() {
        let yaml = r#"
logging:
  level: info
"#;

        let result = Config::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_empty_account_name() {
        let yaml = r#"
account:
  subscription_id: sub-1
  resource_group: rg-1
  name: ""
"#;

        let config = Config::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("account.name"));
    }

    #[test]
    fn test_validate_bad_endpoint_url() {
        let yaml = r#"
account:
  subscription_id: sub-1
  resource_group: rg-1
  name: my-account

endpoints:
  data_plane_root: "not a url"
"#;

        let config = Config::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("data_plane_root"));
    }

    #[test]
    fn test_config_file_with_env_substitution() {
        use std::io::Write;

        std::env::set_var("VI_CONFIG_TEST_SECRET", "s3cret");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
azure:
  tenant_id: "${{VI_CONFIG_TEST_TENANT:}}"
  client_id: app-1
  client_secret: "${{VI_CONFIG_TEST_SECRET}}"

account:
  subscription_id: sub-1
  resource_group: rg-1
  name: my-account
"#
        )
        .unwrap();

        let config = Config::from_file(&file.path().to_path_buf()).unwrap();
        assert!(config.auth.tenant_id.is_none());
        assert_eq!(config.auth.client_id.as_deref(), Some("app-1"));
        assert_eq!(config.auth.client_secret.as_deref(), Some("s3cret"));
        std::env::remove_var("VI_CONFIG_TEST_SECRET");
    }

    #[test]
    fn test_auth_config_debug_redacts_secret() {
        let auth = AuthConfig {
            tenant_id: Some("tenant-1".to_string()),
            client_id: Some("app-1".to_string()),
            client_secret: Some("super-secret".to_string()),
        };

        let rendered = format!("{:?}", auth);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[redacted]"));
    }
}
