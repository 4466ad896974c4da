//! Cache maintenance: expiry sweeps, statistics, bulk clear and prewarming

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use super::freshness::{is_expired_at, now_millis};
use super::matcher::AssetClass;
use super::strategy::{CacheStrategy, fetch_ok, lock, store};
use super::{CacheTtl, CachedResponse};
use crate::client::{Fetcher, Request};
use crate::error::{CacheError, FetchError};

/// Critical URLs fetched at once during preload
const PRELOAD_CONCURRENCY: usize = 4;

/// Default janitor period
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

type PreloadFuture = Pin<Box<dyn Future<Output = (Request, Result<CachedResponse, FetchError>)> + Send>>;

/// Result of one expiry sweep
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub caches_scanned: usize,
    pub entries_removed: usize,
    pub orphaned_caches_removed: usize,
    pub failures: Vec<String>,
}

/// Per-cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub name: String,
    pub entries: usize,
    pub total_bytes: usize,
    pub urls: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub caches_removed: usize,
    pub entries_removed: usize,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreloadFailure {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PreloadReport {
    pub stored: Vec<String>,
    pub failed: Vec<PreloadFailure>,
}

/// Maintenance operations over the caches owned by one namespace.
///
/// Caches outside the namespace prefix are never touched.
pub struct CacheManager {
    strategy: CacheStrategy,
    critical_urls: Vec<Request>,
}

impl CacheManager {
    pub fn new(strategy: CacheStrategy, critical_urls: Vec<Request>) -> Self {
        Self {
            strategy,
            critical_urls,
        }
    }

    #[cfg(test)]
    pub fn strategy(&self) -> &CacheStrategy {
        &self.strategy
    }

    pub fn critical_urls(&self) -> &[Request] {
        &self.critical_urls
    }

    /// Delete expired entries from every namespaced cache, and drop caches
    /// left behind by other versions.
    ///
    /// Each entry is judged by the TTL of the descriptor its URL maps to
    /// today. Failures are recorded and the sweep moves on.
    pub fn cleanup_expired_caches(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        let storage = self.strategy.storage();
        let namespace = self.strategy.namespace();

        let names = match lock(storage).and_then(|s| s.cache_names()) {
            Ok(names) => names,
            Err(e) => {
                warn!("Cache cleanup could not list caches: {}", e);
                report.failures.push(e.to_string());
                return report;
            }
        };

        let now = now_millis();
        for name in names.into_iter().filter(|n| namespace.owns(n)) {
            report.caches_scanned += 1;

            if namespace.is_orphan(&name) {
                match lock(storage).and_then(|s| s.delete_cache(&name)) {
                    Ok(entries) => {
                        debug!("Removed orphaned cache {} ({} entries)", name, entries);
                        report.orphaned_caches_removed += 1;
                    }
                    Err(e) => {
                        warn!("Failed to remove orphaned cache {}: {}", name, e);
                        report.failures.push(format!("{}: {}", name, e));
                    }
                }
                continue;
            }

            let heads = match lock(storage).and_then(|s| s.entry_heads(&name)) {
                Ok(heads) => heads,
                Err(e) => {
                    warn!("Failed to read cache {}: {}", name, e);
                    report.failures.push(format!("{}: {}", name, e));
                    continue;
                }
            };

            for head in heads {
                let ttl = self.strategy.get_cache_strategy(&head.request).ttl;
                if !is_expired_at(&head.response, ttl, now) {
                    continue;
                }
                match lock(storage).and_then(|s| s.delete(&name, &head.request)) {
                    Ok(true) => {
                        debug!("Expired {} from {}", head.request.url, name);
                        report.entries_removed += 1;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Failed to expire {}: {}", head.request.url, e);
                        report.failures.push(format!("{}: {}", head.request.url, e));
                    }
                }
            }
        }

        report
    }

    /// Entry counts, sizes and URLs per namespaced cache
    pub fn get_stats(&self) -> Result<Vec<CacheStats>, CacheError> {
        let storage = lock(self.strategy.storage())?;
        let namespace = self.strategy.namespace();

        let mut stats = Vec::new();
        for name in storage.cache_names()? {
            if !namespace.owns(&name) {
                continue;
            }
            let heads = match storage.entry_heads(&name) {
                Ok(heads) => heads,
                Err(e) => {
                    warn!("Skipping stats for {}: {}", name, e);
                    continue;
                }
            };
            stats.push(CacheStats {
                entries: heads.len(),
                total_bytes: heads.iter().map(|h| h.size_bytes).sum(),
                urls: heads.into_iter().map(|h| h.request.url.to_string()).collect(),
                name,
            });
        }
        Ok(stats)
    }

    /// Delete every namespaced cache
    pub fn clear_all(&self) -> ClearReport {
        let mut report = ClearReport::default();
        let storage = self.strategy.storage();
        let namespace = self.strategy.namespace();

        let names = match lock(storage).and_then(|s| s.cache_names()) {
            Ok(names) => names,
            Err(e) => {
                warn!("Cache clear could not list caches: {}", e);
                report.failures.push(e.to_string());
                return report;
            }
        };

        for name in names.into_iter().filter(|n| namespace.owns(n)) {
            match lock(storage).and_then(|s| s.delete_cache(&name)) {
                Ok(entries) => {
                    debug!("Deleted cache {} ({} entries)", name, entries);
                    report.caches_removed += 1;
                    report.entries_removed += entries;
                }
                Err(e) => {
                    warn!("Failed to delete cache {}: {}", name, e);
                    report.failures.push(format!("{}: {}", name, e));
                }
            }
        }

        report
    }

    /// Fetch every critical URL into the static cache.
    ///
    /// Entries are stamped so the static TTL applies to them. Failed URLs are
    /// reported and skipped.
    pub async fn preload_critical(&self, progress: Option<&ProgressBar>) -> PreloadReport {
        let mut report = PreloadReport::default();
        if self.critical_urls.is_empty() {
            return report;
        }

        let cache_name = self.strategy.namespace().cache_name(AssetClass::Static);
        let fetcher: Arc<dyn Fetcher> = Arc::clone(self.strategy.fetcher());

        let make_future = |request: Request| -> PreloadFuture {
            let fetcher = Arc::clone(&fetcher);
            Box::pin(async move {
                let result = fetch_ok(fetcher.as_ref(), &request).await;
                (request, result)
            })
        };

        debug!(
            "Preloading {} critical URLs with max {} concurrent",
            self.critical_urls.len(),
            PRELOAD_CONCURRENCY
        );

        let mut pending = self.critical_urls.iter().cloned();
        let mut futures: FuturesUnordered<PreloadFuture> = FuturesUnordered::new();
        for request in pending.by_ref().take(PRELOAD_CONCURRENCY) {
            futures.push(make_future(request));
        }

        while let Some((request, result)) = futures.next().await {
            let url = request.url.to_string();
            let outcome = result.map_err(|e| e.to_string()).and_then(|response| {
                store(
                    self.strategy.storage(),
                    &cache_name,
                    &request,
                    &response,
                    Some(CacheTtl::STATIC),
                )
                .map_err(|e| e.to_string())
            });

            match outcome {
                Ok(()) => {
                    debug!("Preloaded {}", url);
                    report.stored.push(url);
                }
                Err(error) => {
                    warn!("Failed to preload {}: {}", url, error);
                    report.failed.push(PreloadFailure { url, error });
                }
            }

            if let Some(pb) = progress {
                pb.inc(1);
            }
            if let Some(next) = pending.next() {
                futures.push(make_future(next));
            }
        }

        report
    }

    /// Sweep once now, then every `period`, until `shutdown` resolves.
    ///
    /// Returns the number of sweeps run.
    pub async fn run_janitor<S, F>(&self, period: Duration, shutdown: S, mut on_sweep: F) -> usize
    where
        S: Future<Output = ()>,
        F: FnMut(&CleanupReport),
    {
        let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut sweeps = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Janitor stopping after {} sweeps", sweeps);
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.cleanup_expired_caches();
                    sweeps += 1;
                    info!(
                        "Cleanup sweep {}: {} expired, {} orphaned caches removed",
                        sweeps, report.entries_removed, report.orphaned_caches_removed
                    );
                    on_sweep(&report);
                }
            }
        }
        sweeps
    }
}
