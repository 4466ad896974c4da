//! Stored HTTP response representation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A response as held in a named cache.
///
/// Header names are always lower-cased so lookups don't depend on how the
/// origin server spelled them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,

    #[serde(default)]
    pub status_text: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(skip)]
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Convenience constructor for a `200 OK` response
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, "OK", body)
    }

    /// Synthetic response returned when neither network nor cache can answer
    pub fn offline() -> Self {
        Self::new(503, "Service Unavailable", "Offline").with_header("content-type", "text/plain")
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
