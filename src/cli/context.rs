//! Command execution context
//!
//! Loads config, opens the cache store and builds the fetcher once, so
//! command handlers start from a ready strategy engine.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use reqwest::Method;
use url::Url;

use crate::cache::strategy::lock;
use crate::cache::{CacheManager, CacheStorage, CacheStrategy};
use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::client::rate_limit::ActionRateLimiter;
use crate::client::{Fetcher, HttpFetcher, Request};
use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::optimizer::AssetOptimizer;

/// Everything a command needs to serve requests against the cache
pub struct CommandContext {
    /// Loaded config with CLI overrides applied
    pub config: Config,
    pub format: OutputFormat,
    /// Parsed site origin, if any
    pub origin: Option<Url>,
    pub fetcher: Arc<dyn Fetcher>,
    pub strategy: CacheStrategy,
}

impl CommandContext {
    /// Load config, apply overrides, open the store and build the fetcher.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let mut config = Config::load_at(opts.config_ref())?;
        if let Some(origin) = opts.origin_ref() {
            config.origin = Some(origin.to_string());
            config.validate()?;
        }
        let origin = config.origin_url()?;

        let storage = Arc::new(Mutex::new(open_storage(opts.cache_dir_ref())?));
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(config.request_timeout())?);
        let strategy = CacheStrategy::new(storage, Arc::clone(&fetcher), config.namespace());

        Ok(Self {
            config,
            format: opts.format,
            origin,
            fetcher,
            strategy,
        })
    }

    /// Build a request, resolving relative input against the origin
    pub fn request(&self, method: Method, input: &str) -> Result<Request> {
        Ok(Request::parse(method, input, self.origin.as_ref())?)
    }

    /// Manager without critical URLs, for sweeps and stats
    pub fn manager(&self) -> CacheManager {
        CacheManager::new(self.strategy.clone(), Vec::new())
    }

    /// Manager with the configured critical URLs resolved
    pub fn preload_manager(&self) -> Result<CacheManager> {
        let critical = self
            .config
            .critical_urls
            .iter()
            .map(|url| self.request(Method::GET, url))
            .collect::<Result<Vec<_>>>()?;
        Ok(CacheManager::new(self.strategy.clone(), critical))
    }

    pub fn optimizer(&self, accept: Option<&str>) -> AssetOptimizer {
        let accept = accept.unwrap_or(self.config.accept.as_str());
        AssetOptimizer::new(Arc::clone(&self.fetcher), accept, self.origin.clone())
    }

    /// Record an attempt at a rate-limited action, failing once the window is full
    pub fn check_rate_limit(&self, action: &str) -> Result<()> {
        let storage = lock(self.strategy.storage())?;
        let allowed = ActionRateLimiter::new(&storage, &self.config.rate_limits).check(action)?;
        if allowed {
            Ok(())
        } else {
            Err(FetchError::RateLimited(action.to_string()).into())
        }
    }
}

/// Cache directory from the override or the platform default
pub fn cache_dir(override_dir: Option<&str>) -> Result<PathBuf> {
    match override_dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(CacheStorage::cache_dir()?),
    }
}

fn open_storage(override_dir: Option<&str>) -> Result<CacheStorage> {
    let dir = cache_dir(override_dir)?;
    Ok(CacheStorage::open_at(&dir)?)
}
