//! Opt-in access-token cache with single-flight fetches
//!
//! The broker itself never caches; repeated calls for the same scope
//! perform independent round-trips. This layer can be switched on via
//! configuration to reuse tokens within a fixed TTL and to coalesce
//! concurrent requests for the same key into one in-flight exchange.
//!
//! The service does not declare a TTL on issued tokens, so entries expire
//! after a conservative fixed interval (default 30 minutes, configurable).

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::trace;

use crate::error::Result;
use crate::token::PermissionLevel;

/// Buffer before entry expiry to trigger a refresh (60 seconds)
const EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default TTL applied to cached tokens
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Token cache configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TokenCacheConfig {
    /// No caching; every call performs its own round-trips
    #[default]
    None,
    /// In-memory cache with a fixed TTL
    Memory {
        /// Entry lifetime (e.g., "30m", "1h"); defaults to 30 minutes
        #[serde(default)]
        #[serde(with = "humantime_serde")]
        ttl: Option<Duration>,
    },
}

/// Key identifying one cacheable token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenCacheKey {
    /// Identity of the credential that authorized the exchange
    pub credential: String,
    /// Permission level the token carries
    pub permission: PermissionLevel,
    /// Scope label (Account, Project, Video, User)
    pub scope: String,
    /// Narrowed resource id, when there is one
    pub resource_id: Option<String>,
}

/// Cached token with expiry tracking
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    /// Check if the token is still usable (with refresh buffer)
    fn is_valid(&self) -> bool {
        Instant::now() + EXPIRY_BUFFER < self.expires_at
    }
}

/// In-memory token cache keyed by (credential, permission, scope, resource).
///
/// Each key owns one async slot; concurrent requests for the same key queue
/// on the slot's mutex, so only the first performs the exchange and the
/// rest observe its result.
pub struct TokenCache {
    ttl: Duration,
    entries: DashMap<TokenCacheKey, Arc<Mutex<Option<CachedToken>>>>,
}

impl TokenCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Build a cache from configuration; `None` disables caching entirely.
    pub fn from_config(config: &TokenCacheConfig) -> Option<Self> {
        match config {
            TokenCacheConfig::None => None,
            TokenCacheConfig::Memory { ttl } => {
                Some(Self::new(ttl.unwrap_or(DEFAULT_TOKEN_TTL)))
            }
        }
    }

    /// Return the cached token for `key`, or run `fetch` to produce one.
    ///
    /// A failed fetch leaves the slot empty, so the next caller retries.
    pub async fn get_or_fetch<F, Fut>(&self, key: TokenCacheKey, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<String>>,
    {
        let slot = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        let mut guard = slot.lock().await;

        if let Some(cached) = guard.as_ref() {
            if cached.is_valid() {
                trace!(scope = %key.scope, "token cache hit");
                return Ok(cached.token.clone());
            }
        }

        trace!(scope = %key.scope, "token cache miss");
        let token = fetch().await?;
        *guard = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + self.ttl,
        });

        Ok(token)
    }
}
