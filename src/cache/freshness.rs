//! Write-time stamping and TTL checks
//!
//! Every entry stored under a TTL-bearing policy carries a `sw-cached-at`
//! header with the write time in epoch milliseconds. An entry without the
//! header is never considered expired.

use std::time::Duration;

use chrono::Utc;

use super::CachedResponse;

/// Header holding the write timestamp (epoch milliseconds)
pub const CACHED_AT_HEADER: &str = "sw-cached-at";

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Write timestamp of a stored response, if present and parsable
pub fn cached_at(response: &CachedResponse) -> Option<i64> {
    response
        .header(CACHED_AT_HEADER)
        .and_then(|v| v.trim().parse::<i64>().ok())
}

/// Stamp a copy of `response` with the given write time
pub fn stamp(response: &CachedResponse, now_ms: i64) -> CachedResponse {
    response
        .clone()
        .with_header(CACHED_AT_HEADER, now_ms.to_string())
}

/// Whether `response` is past `ttl` at `now_ms`.
///
/// Missing or malformed header: not expired. `ttl = None`: not expired.
/// An entry exactly `ttl` old is still fresh.
pub fn is_expired_at(response: &CachedResponse, ttl: Option<Duration>, now_ms: i64) -> bool {
    let (Some(ttl), Some(cached_at)) = (ttl, cached_at(response)) else {
        return false;
    };

    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_ms.saturating_sub(cached_at) > ttl_ms
}

/// [`is_expired_at`] against the wall clock
pub fn is_expired(response: &CachedResponse, ttl: Option<Duration>) -> bool {
    is_expired_at(response, ttl, now_millis())
}
