//! Mock fetcher for testing
//!
//! Serves canned responses keyed by URL and counts calls, so tests can assert
//! whether a strategy touched the network.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use url::Url;

use super::{Fetcher, Request};
use crate::cache::CachedResponse;
use crate::error::FetchError;

/// Mock fetcher for testing.
///
/// # Example
/// ```ignore
/// let mock = MockFetcher::new()
///     .with_response("https://example.com/app.js", CachedResponse::ok("x"));
///
/// let resp = mock.fetch(&request).await?;
/// assert_eq!(mock.fetch_count("https://example.com/app.js").await, 1);
/// ```
#[derive(Default, Clone)]
pub struct MockFetcher {
    /// Responses keyed by absolute URL
    responses: Arc<Mutex<HashMap<String, Result<CachedResponse, FetchError>>>>,
    /// URLs that answer HEAD with success
    existing: Arc<Mutex<HashSet<String>>>,
    /// Fetch calls per URL
    fetches: Arc<Mutex<HashMap<String, usize>>>,
    /// Existence probes per URL
    probes: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, url: &str, response: CachedResponse) -> Self {
        self.set_response_blocking(url, Ok(response));
        self
    }

    pub fn with_error(self, url: &str, error: FetchError) -> Self {
        self.set_response_blocking(url, Err(error));
        self
    }

    pub fn with_existing(self, url: &str) -> Self {
        if let Ok(mut existing) = self.existing.try_lock() {
            existing.insert(url.to_string());
        }
        self
    }

    /// Change the canned result for a URL mid-test
    pub async fn set_response(&self, url: &str, result: Result<CachedResponse, FetchError>) {
        self.responses.lock().await.insert(url.to_string(), result);
    }

    pub async fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().await.get(url).copied().unwrap_or(0)
    }

    pub async fn total_fetches(&self) -> usize {
        self.fetches.lock().await.values().sum()
    }

    pub async fn probe_count(&self, url: &str) -> usize {
        self.probes.lock().await.get(url).copied().unwrap_or(0)
    }

    fn set_response_blocking(&self, url: &str, result: Result<CachedResponse, FetchError>) {
        if let Ok(mut responses) = self.responses.try_lock() {
            responses.insert(url.to_string(), result);
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, FetchError> {
        let url = request.url.to_string();
        *self.fetches.lock().await.entry(url.clone()).or_default() += 1;

        self.responses
            .lock()
            .await
            .get(&url)
            .cloned()
            .unwrap_or_else(|| Ok(CachedResponse::new(404, "Not Found", "")))
    }

    async fn exists(&self, url: &Url) -> bool {
        let url = url.to_string();
        *self.probes.lock().await.entry(url.clone()).or_default() += 1;
        self.existing.lock().await.contains(&url)
    }
}
