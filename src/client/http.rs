//! reqwest-backed fetcher

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, StatusCode};
use url::Url;

use super::rate_limit::RateLimiterSet;
use super::{Fetcher, Request};
use crate::cache::CachedResponse;
use crate::cache::matcher::AssetPatternMatcher;
use crate::error::FetchError;

const USER_AGENT: &str = concat!("foliocache/", env!("CARGO_PKG_VERSION"));

/// Network fetcher over HTTP(S)
pub struct HttpFetcher {
    http: HttpClient,
    matcher: AssetPatternMatcher,
    rate_limits: RateLimiterSet,
}

impl HttpFetcher {
    /// Create a fetcher. Without `timeout` a hung origin hangs the request.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = HttpClient::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http,
            matcher: AssetPatternMatcher::new(),
            rate_limits: RateLimiterSet::new(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, FetchError> {
        let class = self.matcher.classify_url(&request.url);
        self.rate_limits.wait_for(class).await;

        log::debug!("{} {}", request.method, request.url);
        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            self.rate_limits.activate(class).await;
        }

        let mut cached = CachedResponse::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            Vec::new(),
        );
        for (name, value) in response.headers() {
            match value.to_str() {
                Ok(value) => cached.set_header(name.as_str(), value),
                Err(_) => log::debug!("Dropping non-ASCII header {}", name),
            }
        }

        cached.body = response.bytes().await?.to_vec();
        Ok(cached)
    }

    async fn exists(&self, url: &Url) -> bool {
        match self.http.request(Method::HEAD, url.clone()).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::debug!("HEAD {} failed: {}", url, e);
                false
            }
        }
    }
}
