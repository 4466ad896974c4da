//! Configuration management for foliocache

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::{CacheNamespace, DEFAULT_CACHE_PREFIX, DEFAULT_CACHE_VERSION};
use crate::cache::manager::DEFAULT_CLEANUP_INTERVAL;
use crate::client::rate_limit::{MAX_WINDOW_SECS, RateLimitRule};
use crate::error::{ConfigError, Error, Result};
use crate::optimizer::DEFAULT_IMAGE_ACCEPT;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Site origin that relative URLs resolve against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Cache name prefix, e.g. `portfolio`
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Cache name version suffix. Bumping it orphans every existing cache.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// URLs fetched into the static cache by `cache preload`
    #[serde(default = "default_critical_urls")]
    pub critical_urls: Vec<String>,

    /// Janitor period
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Network timeout; unset means requests may hang indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Accept header used for image format negotiation
    #[serde(default = "default_accept")]
    pub accept: String,

    /// Per-action fixed-window limits
    #[serde(default = "default_rate_limits")]
    pub rate_limits: HashMap<String, RateLimitRule>,
}

fn default_cache_prefix() -> String {
    DEFAULT_CACHE_PREFIX.to_string()
}

fn default_cache_version() -> String {
    DEFAULT_CACHE_VERSION.to_string()
}

fn default_critical_urls() -> Vec<String> {
    ["/", "/index.html", "/styles.css", "/script.js", "/manifest.json"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_cleanup_interval_secs() -> u64 {
    DEFAULT_CLEANUP_INTERVAL.as_secs()
}

fn default_accept() -> String {
    DEFAULT_IMAGE_ACCEPT.to_string()
}

fn default_rate_limits() -> HashMap<String, RateLimitRule> {
    HashMap::from([
        (
            "cache-clear".to_string(),
            RateLimitRule {
                max: 3,
                window_secs: 60,
            },
        ),
        (
            "preload".to_string(),
            RateLimitRule {
                max: 5,
                window_secs: 60,
            },
        ),
    ])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: None,
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            critical_urls: default_critical_urls(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            request_timeout_secs: None,
            accept: default_accept(),
            rate_limits: default_rate_limits(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".foliocache").join("config.yaml"))
    }

    /// Resolve an optional override to a concrete path
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load from `path` (or the default path); a missing file yields defaults
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_at(&self, path: Option<&str>) -> Result<PathBuf> {
        let path = Self::resolve_path(path)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the cache layer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.cache_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("cache_prefix must not be empty".to_string()).into());
        }
        if self.cache_version.trim().is_empty() {
            return Err(ConfigError::Invalid("cache_version must not be empty".to_string()).into());
        }
        if self.cleanup_interval_secs == 0 {
            return Err(
                ConfigError::Invalid("cleanup_interval_secs must be positive".to_string()).into(),
            );
        }
        if let Some((action, _)) = self.rate_limits.iter().find(|(_, rule)| rule.max == 0) {
            return Err(ConfigError::Invalid(format!(
                "rate limit for '{}' must allow at least one attempt",
                action
            ))
            .into());
        }
        if let Some((action, rule)) = self
            .rate_limits
            .iter()
            .find(|(_, rule)| !(1..=MAX_WINDOW_SECS).contains(&rule.window_secs))
        {
            return Err(ConfigError::Invalid(format!(
                "rate limit window for '{}' must be between 1 and {} seconds, got {}",
                action, MAX_WINDOW_SECS, rule.window_secs
            ))
            .into());
        }
        if self.origin.is_some() {
            self.origin_url()?;
        }
        Ok(())
    }

    /// Parsed site origin, if configured
    pub fn origin_url(&self) -> Result<Option<Url>> {
        self.origin
            .as_deref()
            .map(|origin| {
                Url::parse(origin).map_err(|e| {
                    Error::from(ConfigError::Invalid(format!("origin '{}': {}", origin, e)))
                })
            })
            .transpose()
    }

    pub fn namespace(&self) -> CacheNamespace {
        CacheNamespace::new(&self.cache_prefix, &self.cache_version)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
