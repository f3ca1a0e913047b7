//! # Store Configuration
//!
//! Store-level settings loaded from environment variables.

use crate::constants::{DEFAULT_PAGE_SIZE, DEFAULT_PREFIX};
use crate::store::CacheTtl;
use std::time::Duration;

/// Store configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Base path for the store (ie. `/prod`)
    pub prefix: String,
    /// Cache lifetime for leaf values (seconds)
    /// `None` or `0` caches until the next refresh
    pub ttl_secs: Option<u64>,
    /// Always refetch leaf values from the backend
    /// Takes precedence over `ttl_secs`
    pub cache_disabled: bool,
    /// AWS region, falls back to the SDK default provider chain when unset
    pub region: Option<String>,
    /// `DescribeParameters` page size
    pub page_size: i32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            ttl_secs: None,
            cache_disabled: false,
            region: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            prefix: lookup("PARAMETER_STORE_PREFIX")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            ttl_secs: lookup("PARAMETER_STORE_TTL_SECS").and_then(|v| v.trim().parse().ok()),
            cache_disabled: lookup("PARAMETER_STORE_CACHE_DISABLED")
                .is_some_and(|v| parse_bool(&v)),
            region: lookup("AWS_REGION").filter(|v| !v.is_empty()),
            page_size: lookup("PARAMETER_STORE_PAGE_SIZE")
                .and_then(|v| v.trim().parse().ok())
                .filter(|size| (1..=DEFAULT_PAGE_SIZE).contains(size))
                .unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    /// Get the cache policy described by this configuration
    #[must_use]
    pub fn cache_ttl(&self) -> CacheTtl {
        if self.cache_disabled {
            return CacheTtl::Disabled;
        }
        match self.ttl_secs {
            Some(secs) => CacheTtl::from(Duration::from_secs(secs)),
            None => CacheTtl::Forever,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    let v_lower = value.to_lowercase();
    v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
}
