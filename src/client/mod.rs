//! Network access for cache strategies

use async_trait::async_trait;
use reqwest::Method;
use url::Url;

use crate::cache::CachedResponse;
use crate::cache::key::request_key;
use crate::error::FetchError;

pub mod http;
#[cfg(test)]
pub mod mock;
pub mod rate_limit;

pub use http::HttpFetcher;
#[cfg(test)]
pub use mock::MockFetcher;

/// A resource request as seen by the caching layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Parse `input` as an absolute URL, or resolve it against `origin`
    pub fn parse(method: Method, input: &str, origin: Option<&Url>) -> Result<Self, FetchError> {
        let url = match Url::parse(input) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => match origin {
                Some(base) => base.join(input)?,
                None => {
                    return Err(FetchError::InvalidUrl(format!(
                        "'{}' is relative and no site origin is configured",
                        input
                    )));
                }
            },
            Err(e) => return Err(e.into()),
        };
        Ok(Self::new(method, url))
    }

    /// Rebuild a request from its stored columns
    pub fn from_stored(method: &str, url: &str) -> Option<Self> {
        let method = Method::from_bytes(method.as_bytes()).ok()?;
        let url = Url::parse(url).ok()?;
        Some(Self::new(method, url))
    }

    /// Storage identity: hash of method and serialized URL
    pub fn key(&self) -> String {
        request_key(self.method.as_str(), self.url.as_str())
    }
}

/// Network fetcher trait
///
/// Returns whatever the server answered; callers decide whether a non-2xx
/// status counts as failure.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request over the network
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, FetchError>;

    /// Probe whether a resource exists (HEAD, 2xx)
    async fn exists(&self, url: &Url) -> bool;
}
