//! Request identity using SHA-256 hashes

use sha2::{Digest, Sha256};

/// Generate a deterministic key for a request.
///
/// The key is a SHA-256 hash of the upper-cased method and the URL exactly as
/// serialized by the URL parser. Trailing slashes and query strings are kept,
/// so `/about` and `/about/` are different entries.
pub fn request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"|");
    hasher.update(url.as_bytes());

    format!("{:x}", hasher.finalize())
}

/// File name for a blob holding the body of `request_key` inside `cache_name`.
///
/// The same request may be stored in several caches, so the cache name is
/// part of the hash.
pub fn blob_key(cache_name: &str, request_key: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(cache_name.as_bytes());
    hasher.update(b"|");
    hasher.update(request_key.as_bytes());

    format!("{:x}", hasher.finalize())
}
