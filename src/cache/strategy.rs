//! Caching algorithms and per-request strategy selection
//!
//! Every request is classified, mapped to a [`StrategyDescriptor`] through a
//! fixed table, and served by one of three algorithms:
//!
//! - cache-first: fresh cache hit wins, network on miss or expiry
//! - network-first: network wins, fresh cache entry on failure
//! - stale-while-revalidate: cached copy now, network refresh in background
//!
//! Recovered failures are reported in [`StrategyOutcome::degradations`]
//! rather than hidden, so callers can decide whether they matter.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use tokio::task::JoinHandle;

use super::freshness::{is_expired, now_millis, stamp};
use super::matcher::{AssetClass, AssetPatternMatcher};
use super::{CacheNamespace, CacheStorage, CacheTtl, CachedResponse};
use crate::client::{Fetcher, Request};
use crate::error::{CacheError, FetchError};

/// Caching algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
        })
    }
}

/// How a single request is cached. Recomputed per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyDescriptor {
    pub class: AssetClass,
    pub strategy: Strategy,
    pub cache_name: String,
    pub ttl: Option<Duration>,
}

impl StrategyDescriptor {
    /// The fixed class → strategy table
    pub fn for_class(class: AssetClass, namespace: &CacheNamespace) -> Self {
        let (strategy, ttl) = match class {
            AssetClass::Static => (Strategy::CacheFirst, Some(CacheTtl::STATIC)),
            AssetClass::Image => (Strategy::CacheFirst, Some(CacheTtl::IMAGES)),
            AssetClass::Font => (Strategy::CacheFirst, Some(CacheTtl::FONTS)),
            AssetClass::Api => (Strategy::NetworkFirst, Some(CacheTtl::API)),
            AssetClass::Cdn => (Strategy::StaleWhileRevalidate, None),
            AssetClass::Dynamic => (Strategy::NetworkFirst, Some(CacheTtl::DYNAMIC)),
        };

        Self {
            class,
            strategy,
            cache_name: namespace.cache_name(class),
            ttl,
        }
    }
}

/// Where the returned response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedFrom {
    Cache,
    Network,
    /// Synthetic 503, nothing else was available
    Offline,
}

impl fmt::Display for ServedFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServedFrom::Cache => "cache",
            ServedFrom::Network => "network",
            ServedFrom::Offline => "offline",
        })
    }
}

/// A failure the strategy recovered from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Degradation {
    CacheReadFailed(String),
    CacheWriteFailed(String),
    NetworkFailed(String),
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::CacheReadFailed(e) => write!(f, "cache read failed: {}", e),
            Degradation::CacheWriteFailed(e) => write!(f, "cache write failed: {}", e),
            Degradation::NetworkFailed(e) => write!(f, "network failed: {}", e),
        }
    }
}

/// Background refresh started by stale-while-revalidate
pub type Revalidation = JoinHandle<Result<(CachedResponse, Option<Degradation>), FetchError>>;

/// Result of serving one request
#[derive(Debug)]
pub struct StrategyOutcome {
    pub response: CachedResponse,
    pub served_from: ServedFrom,
    pub degradations: Vec<Degradation>,
    /// In-flight refresh, only set when a cached copy was returned by SWR
    pub revalidation: Option<Revalidation>,
}

impl StrategyOutcome {
    fn new(response: CachedResponse, served_from: ServedFrom, degradations: Vec<Degradation>) -> Self {
        Self {
            response,
            served_from,
            degradations,
            revalidation: None,
        }
    }

    /// Wait for a pending background refresh, if any.
    ///
    /// Returns `None` when nothing was pending.
    pub async fn wait_for_revalidation(&mut self) -> Option<Result<(), FetchError>> {
        let handle = self.revalidation.take()?;
        let result = match handle.await {
            Ok(Ok((_, write_failure))) => {
                self.degradations.extend(write_failure);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(e) => Err(FetchError::Network(format!("Revalidation task failed: {}", e))),
        };
        Some(result)
    }
}

/// Strategy engine over a shared store and a network fetcher
#[derive(Clone)]
pub struct CacheStrategy {
    storage: Arc<Mutex<CacheStorage>>,
    fetcher: Arc<dyn Fetcher>,
    matcher: AssetPatternMatcher,
    namespace: CacheNamespace,
}

impl CacheStrategy {
    pub fn new(
        storage: Arc<Mutex<CacheStorage>>,
        fetcher: Arc<dyn Fetcher>,
        namespace: CacheNamespace,
    ) -> Self {
        Self {
            storage,
            fetcher,
            matcher: AssetPatternMatcher::new(),
            namespace,
        }
    }

    pub fn storage(&self) -> &Arc<Mutex<CacheStorage>> {
        &self.storage
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn namespace(&self) -> &CacheNamespace {
        &self.namespace
    }

    /// Classify a request and look up its descriptor
    pub fn get_cache_strategy(&self, request: &Request) -> StrategyDescriptor {
        let class = self.matcher.classify_url(&request.url);
        StrategyDescriptor::for_class(class, &self.namespace)
    }

    /// Serve a request with whatever strategy its class calls for
    pub async fn handle(&self, request: &Request) -> Result<StrategyOutcome, FetchError> {
        let descriptor = self.get_cache_strategy(request);
        self.execute(request, &descriptor).await
    }

    /// Serve a request with an explicit descriptor. Requests other than GET
    /// never touch the cache; whatever the server answers is returned as-is.
    pub async fn execute(
        &self,
        request: &Request,
        descriptor: &StrategyDescriptor,
    ) -> Result<StrategyOutcome, FetchError> {
        if !is_cacheable(request) {
            log::debug!("Bypassing cache for {} {}", request.method, request.url);
            let response = self.fetcher.fetch(request).await?;
            return Ok(StrategyOutcome::new(response, ServedFrom::Network, Vec::new()));
        }

        let cache_name = descriptor.cache_name.as_str();
        match descriptor.strategy {
            Strategy::CacheFirst => Ok(self.cache_first(request, cache_name, descriptor.ttl).await),
            Strategy::NetworkFirst => self.network_first(request, cache_name, descriptor.ttl).await,
            Strategy::StaleWhileRevalidate => {
                self.stale_while_revalidate(request, cache_name, descriptor.ttl)
                    .await
            }
        }
    }

    /// Cache-first. Never fails: worst case is a synthetic 503.
    pub async fn cache_first(
        &self,
        request: &Request,
        cache_name: &str,
        ttl: Option<Duration>,
    ) -> StrategyOutcome {
        let mut degradations = Vec::new();

        let cached = lookup(&self.storage, cache_name, request).unwrap_or_else(|e| {
            log::warn!("Cache read failed for {}: {}", request.url, e);
            degradations.push(Degradation::CacheReadFailed(e.to_string()));
            None
        });

        let stale = match cached {
            Some(hit) if !is_expired(&hit, ttl) => {
                log::debug!("Cache hit: {}", request.url);
                return StrategyOutcome::new(hit, ServedFrom::Cache, degradations);
            }
            Some(hit) => {
                log::debug!("Cache entry expired: {}", request.url);
                if let Err(e) = remove(&self.storage, cache_name, request) {
                    log::warn!("Failed to evict expired entry {}: {}", request.url, e);
                    degradations.push(Degradation::CacheWriteFailed(e.to_string()));
                }
                Some(hit)
            }
            None => {
                log::debug!("Cache miss: {}", request.url);
                None
            }
        };

        match fetch_ok(self.fetcher.as_ref(), request).await {
            Ok(response) => {
                if let Err(e) = store(&self.storage, cache_name, request, &response, ttl) {
                    log::warn!("Failed to cache {}: {}", request.url, e);
                    degradations.push(Degradation::CacheWriteFailed(e.to_string()));
                }
                StrategyOutcome::new(response, ServedFrom::Network, degradations)
            }
            Err(e) => {
                log::warn!("Network failed for {}: {}", request.url, e);
                degradations.push(Degradation::NetworkFailed(e.to_string()));
                match stale {
                    Some(response) => StrategyOutcome::new(response, ServedFrom::Cache, degradations),
                    None => StrategyOutcome::new(
                        CachedResponse::offline(),
                        ServedFrom::Offline,
                        degradations,
                    ),
                }
            }
        }
    }

    /// Network-first. Fails with the original network error when no fresh
    /// cached copy exists.
    pub async fn network_first(
        &self,
        request: &Request,
        cache_name: &str,
        ttl: Option<Duration>,
    ) -> Result<StrategyOutcome, FetchError> {
        let err = match fetch_ok(self.fetcher.as_ref(), request).await {
            Ok(response) => {
                let mut degradations = Vec::new();
                if let Err(e) = store(&self.storage, cache_name, request, &response, ttl) {
                    log::warn!("Failed to cache {}: {}", request.url, e);
                    degradations.push(Degradation::CacheWriteFailed(e.to_string()));
                }
                return Ok(StrategyOutcome::new(response, ServedFrom::Network, degradations));
            }
            Err(err) => err,
        };

        log::warn!("Network failed for {}, trying cache: {}", request.url, err);
        match lookup(&self.storage, cache_name, request) {
            Ok(Some(hit)) if !is_expired(&hit, ttl) => {
                log::debug!("Serving cached fallback: {}", request.url);
                Ok(StrategyOutcome::new(
                    hit,
                    ServedFrom::Cache,
                    vec![Degradation::NetworkFailed(err.to_string())],
                ))
            }
            Ok(_) => Err(err),
            Err(e) => {
                log::warn!("Cache read failed for {}: {}", request.url, e);
                Err(err)
            }
        }
    }

    /// Stale-while-revalidate. The network fetch starts before the cache is
    /// read; a fresh cached copy is returned without waiting for it.
    pub async fn stale_while_revalidate(
        &self,
        request: &Request,
        cache_name: &str,
        ttl: Option<Duration>,
    ) -> Result<StrategyOutcome, FetchError> {
        let revalidation: Revalidation = tokio::spawn(revalidate(
            Arc::clone(&self.storage),
            Arc::clone(&self.fetcher),
            request.clone(),
            cache_name.to_string(),
            ttl,
        ));

        let mut degradations = Vec::new();
        let cached = lookup(&self.storage, cache_name, request).unwrap_or_else(|e| {
            log::warn!("Cache read failed for {}: {}", request.url, e);
            degradations.push(Degradation::CacheReadFailed(e.to_string()));
            None
        });

        if let Some(hit) = cached.filter(|hit| !is_expired(hit, ttl)) {
            log::debug!("Serving cached copy while revalidating: {}", request.url);
            let mut outcome = StrategyOutcome::new(hit, ServedFrom::Cache, degradations);
            outcome.revalidation = Some(revalidation);
            return Ok(outcome);
        }

        match revalidation.await {
            Ok(Ok((response, write_failure))) => {
                degradations.extend(write_failure);
                Ok(StrategyOutcome::new(response, ServedFrom::Network, degradations))
            }
            Ok(Err(e)) => Err(e),
            Err(e) => Err(FetchError::Network(format!("Revalidation task failed: {}", e))),
        }
    }
}

/// Only GET responses are stored or served from a cache
pub fn is_cacheable(request: &Request) -> bool {
    request.method == Method::GET
}

/// Fetch and store on success; used by SWR both in and out of the background
async fn revalidate(
    storage: Arc<Mutex<CacheStorage>>,
    fetcher: Arc<dyn Fetcher>,
    request: Request,
    cache_name: String,
    ttl: Option<Duration>,
) -> Result<(CachedResponse, Option<Degradation>), FetchError> {
    let response = fetch_ok(fetcher.as_ref(), &request).await.inspect_err(|e| {
        log::warn!("Revalidation of {} failed: {}", request.url, e);
    })?;

    let write_failure = match store(&storage, &cache_name, &request, &response, ttl) {
        Ok(()) => {
            log::debug!("Revalidated: {}", request.url);
            None
        }
        Err(e) => {
            log::warn!("Failed to cache {}: {}", request.url, e);
            Some(Degradation::CacheWriteFailed(e.to_string()))
        }
    };

    Ok((response, write_failure))
}

/// Fetch, treating any non-2xx status as a failure
pub(crate) async fn fetch_ok(
    fetcher: &dyn Fetcher,
    request: &Request,
) -> Result<CachedResponse, FetchError> {
    let response = fetcher.fetch(request).await?;
    if response.is_success() {
        Ok(response)
    } else {
        Err(FetchError::Status(response.status))
    }
}

pub(crate) fn lock(
    storage: &Mutex<CacheStorage>,
) -> Result<MutexGuard<'_, CacheStorage>, CacheError> {
    storage.lock().map_err(|_| CacheError::Poisoned)
}

fn lookup(
    storage: &Mutex<CacheStorage>,
    cache_name: &str,
    request: &Request,
) -> Result<Option<CachedResponse>, CacheError> {
    lock(storage)?.match_request(cache_name, request)
}

fn remove(storage: &Mutex<CacheStorage>, cache_name: &str, request: &Request) -> Result<bool, CacheError> {
    lock(storage)?.delete(cache_name, request)
}

/// Store a copy of `response`, stamped with the write time when a TTL applies
pub(crate) fn store(
    storage: &Mutex<CacheStorage>,
    cache_name: &str,
    request: &Request,
    response: &CachedResponse,
    ttl: Option<Duration>,
) -> Result<(), CacheError> {
    let entry = match ttl {
        Some(_) => stamp(response, now_millis()),
        None => response.clone(),
    };
    lock(storage)?.put(cache_name, request, &entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::freshness::{CACHED_AT_HEADER, cached_at};
    use crate::client::MockFetcher;
    use tempfile::TempDir;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn setup(mock: MockFetcher) -> (CacheStrategy, MockFetcher, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::open_at(dir.path()).unwrap();
        let strategy = CacheStrategy::new(
            Arc::new(Mutex::new(storage)),
            Arc::new(mock.clone()),
            CacheNamespace::default(),
        );
        (strategy, mock, dir)
    }

    fn get(url: &str) -> Request {
        Request::get(url.parse().unwrap())
    }

    fn stored(strategy: &CacheStrategy, cache: &str, req: &Request) -> Option<CachedResponse> {
        lock(strategy.storage()).unwrap().match_request(cache, req).unwrap()
    }

    #[test]
    fn test_descriptor_table() {
        let ns = CacheNamespace::default();

        let d = StrategyDescriptor::for_class(AssetClass::Static, &ns);
        assert_eq!(d.strategy, Strategy::CacheFirst);
        assert_eq!(d.cache_name, "portfolio-static-v2.0.0");
        assert_eq!(d.ttl, Some(Duration::from_secs(7 * 24 * 3600)));

        let d = StrategyDescriptor::for_class(AssetClass::Image, &ns);
        assert_eq!(d.strategy, Strategy::CacheFirst);
        assert_eq!(d.ttl, Some(Duration::from_secs(30 * 24 * 3600)));

        let d = StrategyDescriptor::for_class(AssetClass::Font, &ns);
        assert_eq!(d.strategy, Strategy::CacheFirst);
        assert_eq!(d.ttl, Some(Duration::from_secs(365 * 24 * 3600)));

        let d = StrategyDescriptor::for_class(AssetClass::Api, &ns);
        assert_eq!(d.strategy, Strategy::NetworkFirst);
        assert_eq!(d.ttl, Some(Duration::from_secs(5 * 60)));

        let d = StrategyDescriptor::for_class(AssetClass::Cdn, &ns);
        assert_eq!(d.strategy, Strategy::StaleWhileRevalidate);
        assert_eq!(d.ttl, None);

        let d = StrategyDescriptor::for_class(AssetClass::Dynamic, &ns);
        assert_eq!(d.strategy, Strategy::NetworkFirst);
        assert_eq!(d.cache_name, "portfolio-dynamic-v2.0.0");
        assert_eq!(d.ttl, Some(Duration::from_secs(24 * 3600)));
    }

    #[test]
    fn test_static_urls_get_cache_first() {
        let (strategy, _mock, _dir) = setup(MockFetcher::new());
        for url in ["/index.html", "/app.js"] {
            let d = StrategyDescriptor::for_class(strategy.matcher.classify(url), strategy.namespace());
            assert_eq!(d.strategy, Strategy::CacheFirst);
            assert_eq!(d.cache_name, "portfolio-static-v2.0.0");
            assert_eq!(d.ttl, Some(CacheTtl::STATIC));
        }
    }

    #[test]
    fn test_cdn_urls_get_swr_without_ttl() {
        let (strategy, _mock, _dir) = setup(MockFetcher::new());
        let d = strategy.get_cache_strategy(&get(
            "https://fonts.googleapis.com/css2?family=Inter:wght@400;700&display=swap",
        ));
        assert_eq!(d.strategy, Strategy::StaleWhileRevalidate);
        assert_eq!(d.ttl, None);
    }

    #[tokio::test]
    async fn test_cache_first_second_read_skips_network() {
        let url = "https://example.com/app.js";
        let (strategy, mock, _dir) =
            setup(MockFetcher::new().with_response(url, CachedResponse::ok("let a = 1;")));
        let req = get(url);
        let cache = "portfolio-static-v2.0.0";

        let first = strategy.cache_first(&req, cache, Some(CacheTtl::STATIC)).await;
        assert_eq!(first.served_from, ServedFrom::Network);

        let second = strategy.cache_first(&req, cache, Some(CacheTtl::STATIC)).await;
        assert_eq!(second.served_from, ServedFrom::Cache);
        assert_eq!(second.response.body, b"let a = 1;");

        assert_eq!(mock.fetch_count(url).await, 1);
    }

    #[tokio::test]
    async fn test_cache_first_returns_unstamped_network_response() {
        let url = "https://example.com/app.js";
        let (strategy, _mock, _dir) =
            setup(MockFetcher::new().with_response(url, CachedResponse::ok("x")));
        let req = get(url);
        let cache = "portfolio-static-v2.0.0";

        let outcome = strategy.cache_first(&req, cache, Some(CacheTtl::STATIC)).await;

        assert!(outcome.response.header(CACHED_AT_HEADER).is_none());
        let entry = stored(&strategy, cache, &req).unwrap();
        assert!(cached_at(&entry).is_some());
    }

    #[tokio::test]
    async fn test_cache_first_replaces_entry_older_than_ttl() {
        let url = "https://example.com/images/photo.jpg";
        let (strategy, mock, _dir) =
            setup(MockFetcher::new().with_response(url, CachedResponse::ok("new pixels")));
        let req = get(url);
        let cache = "portfolio-images-v2.0.0";

        let old = stamp(&CachedResponse::ok("old pixels"), now_millis() - 31 * DAY_MS);
        lock(strategy.storage()).unwrap().put(cache, &req, &old).unwrap();

        let before = now_millis();
        let outcome = strategy.cache_first(&req, cache, Some(CacheTtl::IMAGES)).await;

        assert_eq!(outcome.served_from, ServedFrom::Network);
        assert_eq!(outcome.response.body, b"new pixels");
        assert_eq!(mock.fetch_count(url).await, 1);

        let entry = stored(&strategy, cache, &req).unwrap();
        assert_eq!(entry.body, b"new pixels");
        assert!(cached_at(&entry).unwrap() >= before);
    }

    #[tokio::test]
    async fn test_cache_first_offline_without_cache() {
        let url = "https://example.com/app.js";
        let (strategy, _mock, _dir) = setup(
            MockFetcher::new().with_error(url, FetchError::Network("unreachable".to_string())),
        );

        let outcome = strategy
            .cache_first(&get(url), "portfolio-static-v2.0.0", Some(CacheTtl::STATIC))
            .await;

        assert_eq!(outcome.served_from, ServedFrom::Offline);
        assert_eq!(outcome.response.status, 503);
        assert_eq!(outcome.response.body, b"Offline");
        assert!(matches!(
            outcome.degradations.as_slice(),
            [Degradation::NetworkFailed(_)]
        ));
    }

    #[tokio::test]
    async fn test_cache_first_falls_back_to_expired_copy_when_offline() {
        let url = "https://example.com/app.js";
        let (strategy, _mock, _dir) = setup(
            MockFetcher::new().with_error(url, FetchError::Network("unreachable".to_string())),
        );
        let req = get(url);
        let cache = "portfolio-static-v2.0.0";

        let old = stamp(&CachedResponse::ok("old"), now_millis() - 8 * DAY_MS);
        lock(strategy.storage()).unwrap().put(cache, &req, &old).unwrap();

        let outcome = strategy.cache_first(&req, cache, Some(CacheTtl::STATIC)).await;

        assert_eq!(outcome.served_from, ServedFrom::Cache);
        assert_eq!(outcome.response.body, b"old");
        // Eviction happened before the network attempt
        assert!(stored(&strategy, cache, &req).is_none());
    }

    #[tokio::test]
    async fn test_cache_first_does_not_store_error_status() {
        let url = "https://example.com/missing.js";
        let (strategy, _mock, _dir) = setup(MockFetcher::new());
        let req = get(url);
        let cache = "portfolio-static-v2.0.0";

        let outcome = strategy.cache_first(&req, cache, Some(CacheTtl::STATIC)).await;

        assert_eq!(outcome.served_from, ServedFrom::Offline);
        assert!(stored(&strategy, cache, &req).is_none());
    }

    #[tokio::test]
    async fn test_network_first_stores_and_falls_back() {
        let url = "https://example.com/api/data.json";
        let (strategy, mock, _dir) =
            setup(MockFetcher::new().with_response(url, CachedResponse::ok("{\"v\":1}")));
        let req = get(url);
        let cache = "portfolio-api-v2.0.0";

        let first = strategy
            .network_first(&req, cache, Some(CacheTtl::API))
            .await
            .unwrap();
        assert_eq!(first.served_from, ServedFrom::Network);

        mock.set_response(url, Err(FetchError::Network("down".to_string())))
            .await;

        let second = strategy
            .network_first(&req, cache, Some(CacheTtl::API))
            .await
            .unwrap();
        assert_eq!(second.served_from, ServedFrom::Cache);
        assert_eq!(second.response.body, b"{\"v\":1}");
        assert_eq!(mock.fetch_count(url).await, 2);
    }

    #[tokio::test]
    async fn test_network_first_propagates_original_error() {
        let url = "https://example.com/api/data.json";
        let original = FetchError::Network("connection reset".to_string());
        let (strategy, _mock, _dir) = setup(MockFetcher::new().with_error(url, original.clone()));

        let err = strategy
            .network_first(&get(url), "portfolio-api-v2.0.0", Some(CacheTtl::API))
            .await
            .unwrap_err();

        assert_eq!(err, original);
    }

    #[tokio::test]
    async fn test_network_first_ignores_expired_fallback() {
        let url = "https://example.com/api/data.json";
        let (strategy, _mock, _dir) =
            setup(MockFetcher::new().with_error(url, FetchError::Status(500)));
        let req = get(url);
        let cache = "portfolio-api-v2.0.0";

        let old = stamp(&CachedResponse::ok("{}"), now_millis() - 10 * 60 * 1000);
        lock(strategy.storage()).unwrap().put(cache, &req, &old).unwrap();

        let err = strategy
            .network_first(&req, cache, Some(CacheTtl::API))
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Status(500));
    }

    #[tokio::test]
    async fn test_swr_returns_cached_then_refreshes() {
        let url = "https://fonts.googleapis.com/css2?family=Inter";
        let (strategy, mock, _dir) =
            setup(MockFetcher::new().with_response(url, CachedResponse::ok("fresh css")));
        let req = get(url);
        let cache = "portfolio-cdn-v2.0.0";

        lock(strategy.storage())
            .unwrap()
            .put(cache, &req, &CachedResponse::ok("old css"))
            .unwrap();

        let mut outcome = strategy.stale_while_revalidate(&req, cache, None).await.unwrap();
        assert_eq!(outcome.served_from, ServedFrom::Cache);
        assert_eq!(outcome.response.body, b"old css");

        assert!(matches!(outcome.wait_for_revalidation().await, Some(Ok(()))));
        assert_eq!(stored(&strategy, cache, &req).unwrap().body, b"fresh css");
        assert_eq!(mock.fetch_count(url).await, 1);
    }

    #[tokio::test]
    async fn test_swr_without_cache_waits_for_network() {
        let url = "https://unpkg.com/aos@2.3.1/dist/aos";
        let (strategy, _mock, _dir) =
            setup(MockFetcher::new().with_response(url, CachedResponse::ok("aos")));
        let req = get(url);
        let cache = "portfolio-cdn-v2.0.0";

        let mut outcome = strategy.stale_while_revalidate(&req, cache, None).await.unwrap();

        assert_eq!(outcome.served_from, ServedFrom::Network);
        assert!(outcome.revalidation.is_none());
        assert!(outcome.wait_for_revalidation().await.is_none());

        // No TTL, so no stamp
        let entry = stored(&strategy, cache, &req).unwrap();
        assert!(entry.header(CACHED_AT_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_swr_without_cache_propagates_failure() {
        let url = "https://unpkg.com/aos@2.3.1/dist/aos";
        let (strategy, _mock, _dir) =
            setup(MockFetcher::new().with_error(url, FetchError::Network("down".to_string())));

        let err = strategy
            .stale_while_revalidate(&get(url), "portfolio-cdn-v2.0.0", None)
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Network("down".to_string()));
    }

    #[tokio::test]
    async fn test_swr_failed_refresh_keeps_cached_copy() {
        let url = "https://fonts.googleapis.com/css2?family=Inter";
        let (strategy, _mock, _dir) = setup(MockFetcher::new().with_error(url, FetchError::Status(502)));
        let req = get(url);
        let cache = "portfolio-cdn-v2.0.0";

        lock(strategy.storage())
            .unwrap()
            .put(cache, &req, &CachedResponse::ok("old css"))
            .unwrap();

        let mut outcome = strategy.stale_while_revalidate(&req, cache, None).await.unwrap();
        assert_eq!(outcome.response.body, b"old css");
        assert!(matches!(
            outcome.wait_for_revalidation().await,
            Some(Err(FetchError::Status(502)))
        ));
        assert_eq!(stored(&strategy, cache, &req).unwrap().body, b"old css");
    }

    #[tokio::test]
    async fn test_post_is_never_stored_or_served_from_cache() {
        let url = "https://example.com/api/contact";
        let (strategy, mock, _dir) =
            setup(MockFetcher::new().with_response(url, CachedResponse::ok("sent")));
        let post = Request::new(Method::POST, url.parse().unwrap());
        let cache = "portfolio-api-v2.0.0";

        let first = strategy.handle(&post).await.unwrap();
        assert_eq!(first.served_from, ServedFrom::Network);
        assert_eq!(first.response.body, b"sent");
        assert!(stored(&strategy, cache, &post).is_none());
        assert!(lock(strategy.storage()).unwrap().cache_names().unwrap().is_empty());

        mock.set_response(url, Err(FetchError::Network("down".to_string())))
            .await;

        let err = strategy.handle(&post).await.unwrap_err();
        assert_eq!(err, FetchError::Network("down".to_string()));
        assert_eq!(mock.fetch_count(url).await, 2);
    }

    #[tokio::test]
    async fn test_non_get_error_status_passes_through() {
        let url = "https://example.com/app.js";
        let (strategy, _mock, _dir) = setup(MockFetcher::new());
        let delete = Request::new(Method::DELETE, url.parse().unwrap());

        // Cache-first class, but no offline 503 substitution off the GET path
        let outcome = strategy.handle(&delete).await.unwrap();
        assert_eq!(outcome.served_from, ServedFrom::Network);
        assert_eq!(outcome.response.status, 404);
    }

    #[tokio::test]
    async fn test_handle_dispatches_by_class() {
        let url = "https://example.com/api/data.json";
        let (strategy, _mock, _dir) =
            setup(MockFetcher::new().with_error(url, FetchError::Network("down".to_string())));

        // API is network-first, so the failure surfaces as an error
        assert!(strategy.handle(&get(url)).await.is_err());

        // Static is cache-first, so the same failure becomes a 503
        let outcome = strategy
            .handle(&get("https://example.com/app.js"))
            .await
            .unwrap();
        assert_eq!(outcome.served_from, ServedFrom::Offline);
    }
}
