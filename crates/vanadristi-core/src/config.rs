//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::error::{Error, Result};

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api-vanadristi.snehkr.in/api/v1";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Settings for [`crate::ApiClient`] and [`crate::QueryClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, e.g. `https://host/api/v1`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Cache timing.
    pub cache: CacheConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Config pointing at another server.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the cache configuration.
    #[must_use]
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the values before building a client.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::invalid_config("timeout must be at least 1 second"));
        }
        if self.cache.gc_time < self.cache.stale_time {
            return Err(Error::invalid_config(
                "gc_time must not be shorter than stale_time",
            ));
        }
        Ok(())
    }
}
