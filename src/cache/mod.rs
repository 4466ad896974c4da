//! Asset caching layer
//!
//! Classifies requests, picks a caching algorithm per asset class and runs it
//! against named caches persisted in SQLite (with file blobs for large
//! bodies). [`CacheManager`] sweeps expired entries independently.

pub mod freshness;
pub mod key;
pub mod manager;
pub mod matcher;
pub mod response;
pub mod storage;
pub mod strategy;

use std::time::Duration;

use matcher::AssetClass;

/// Cache TTL configuration per asset class
///
/// Plain constants on purpose: changing a TTL means editing and redeploying.
pub struct CacheTtl;

impl CacheTtl {
    // Versioned bundles, safe to keep for a week
    pub const STATIC: Duration = Duration::from_secs(7 * 24 * 60 * 60); // 7 days
    pub const IMAGES: Duration = Duration::from_secs(30 * 24 * 60 * 60); // 30 days
    pub const FONTS: Duration = Duration::from_secs(365 * 24 * 60 * 60); // 1 year

    // Portfolio data changes when projects are published
    pub const API: Duration = Duration::from_secs(5 * 60); // 5 min
    pub const DYNAMIC: Duration = Duration::from_secs(24 * 60 * 60); // 1 day
}

/// Default namespace prefix shared by every cache this tool owns
pub const DEFAULT_CACHE_PREFIX: &str = "portfolio";

/// Default version suffix. Bumping it orphans every existing cache.
pub const DEFAULT_CACHE_VERSION: &str = "v2.0.0";

/// Versioned cache naming, e.g. `portfolio-static-v2.0.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNamespace {
    prefix: String,
    version: String,
}

impl Default for CacheNamespace {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_PREFIX, DEFAULT_CACHE_VERSION)
    }
}

impl CacheNamespace {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            version: version.into(),
        }
    }

    /// Name of the single active cache for an asset class
    pub fn cache_name(&self, class: AssetClass) -> String {
        format!("{}-{}-{}", self.prefix, class.cache_segment(), self.version)
    }

    /// All currently active cache names, one per asset class
    pub fn active_names(&self) -> Vec<String> {
        AssetClass::ALL
            .iter()
            .map(|class| self.cache_name(*class))
            .collect()
    }

    /// Whether a cache name lives in this namespace (any version)
    pub fn owns(&self, cache_name: &str) -> bool {
        cache_name
            .strip_prefix(&self.prefix)
            .is_some_and(|rest| rest.starts_with('-'))
    }

    /// Whether a namespaced cache belongs to an older (or newer) version
    pub fn is_orphan(&self, cache_name: &str) -> bool {
        self.owns(cache_name) && !self.active_names().iter().any(|n| n == cache_name)
    }
}

// Re-export main types
pub use manager::CacheManager;
pub use response::CachedResponse;
pub use storage::CacheStorage;
pub use strategy::{CacheStrategy, Strategy, StrategyDescriptor};
