//! SQLite-based named cache storage with file blob support
//!
//! Mirrors the browser Cache Storage model: a set of named caches, each
//! mapping request identity to a stored response. Small bodies are stored
//! inline, large bodies (>10KB) as files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use super::CachedResponse;
use super::key::blob_key;
use crate::client::Request;
use crate::client::rate_limit::RateLimiterState;
use crate::error::CacheError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

/// Bodies larger than this are stored as external blobs
const INLINE_THRESHOLD: usize = 10 * 1024; // 10KB

type Result<T> = std::result::Result<T, CacheError>;

/// Request and response metadata of a stored entry, without the body
#[derive(Debug, Clone)]
pub struct EntryHead {
    pub request: Request,
    pub response: CachedResponse,
    pub size_bytes: usize,
}

/// SQLite-backed named caches with file blob support
pub struct CacheStorage {
    conn: Connection,
    blobs_dir: PathBuf,
}

impl CacheStorage {
    /// Get the cache directory path (~/.cache/foliocache on Linux)
    pub fn cache_dir() -> Result<PathBuf> {
        let cache_base = dirs::cache_dir().ok_or(CacheError::NoHome)?;
        Ok(cache_base.join("foliocache"))
    }

    /// Open storage at a specific directory
    pub fn open_at(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create cache dir: {}", e)))?;

        let db_path = cache_dir.join("cache.db");
        let blobs_dir = cache_dir.join("blobs");
        std::fs::create_dir_all(&blobs_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create blobs dir: {}", e)))?;

        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Cache schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            Self::nuke(&db_path, &blobs_dir)?;
            return Self::open_at(cache_dir);
        }

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS caches (
                name TEXT PRIMARY KEY NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS entries (
                cache_name TEXT NOT NULL REFERENCES caches(name) ON DELETE CASCADE,
                request_key TEXT NOT NULL,
                method TEXT NOT NULL,
                url TEXT NOT NULL,
                status INTEGER NOT NULL,
                status_text TEXT NOT NULL,
                headers TEXT NOT NULL,
                body BLOB,
                blob_path TEXT,
                stored_at INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL,
                PRIMARY KEY (cache_name, request_key)
            );

            CREATE TABLE IF NOT EXISTS rate_limits (
                action TEXT PRIMARY KEY NOT NULL,
                count INTEGER NOT NULL,
                reset_time INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_entries_cache ON entries(cache_name);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self { conn, blobs_dir })
    }

    /// Create the named cache if it does not exist yet
    pub fn open_cache(&self, cache_name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
            params![cache_name, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub fn has_cache(&self, cache_name: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM caches WHERE name = ?1",
                [cache_name],
                |r| r.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Names of every cache, sorted
    pub fn cache_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM caches ORDER BY name")?;
        let names = stmt
            .query_map([], |r| r.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Delete a cache and every entry in it. Returns the number of entries removed.
    pub fn delete_cache(&self, cache_name: &str) -> Result<usize> {
        let blobs = self.blob_paths(cache_name)?;

        let removed = self
            .conn
            .execute("DELETE FROM entries WHERE cache_name = ?1", [cache_name])?;
        self.conn
            .execute("DELETE FROM caches WHERE name = ?1", [cache_name])?;

        for blob in blobs {
            self.remove_blob(&blob);
        }

        Ok(removed)
    }

    /// Look up a stored response for `request` in `cache_name`
    pub fn match_request(
        &self,
        cache_name: &str,
        request: &Request,
    ) -> Result<Option<CachedResponse>> {
        let key = request.key();

        let row: Option<(u16, String, String, Option<Vec<u8>>, Option<String>)> = self
            .conn
            .query_row(
                "SELECT status, status_text, headers, body, blob_path FROM entries
                 WHERE cache_name = ?1 AND request_key = ?2",
                params![cache_name, key],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((status, status_text, headers, body, blob_path)) = row else {
            return Ok(None);
        };

        let body = match (body, blob_path) {
            (Some(body), None) => body,
            (None, Some(blob_path)) => {
                let full_path = self.blobs_dir.join(&blob_path);
                match std::fs::read(&full_path) {
                    Ok(data) => data,
                    Err(e) => {
                        log::warn!("Failed to read blob {}: {}", blob_path, e);
                        // Entry is unusable without its body
                        if let Err(e) = self.conn.execute(
                            "DELETE FROM entries WHERE cache_name = ?1 AND request_key = ?2",
                            params![cache_name, key],
                        ) {
                            log::warn!(
                                "Failed to drop entry for missing blob {}: {}",
                                blob_path,
                                e
                            );
                        }
                        return Ok(None);
                    }
                }
            }
            _ => Vec::new(),
        };

        let headers: BTreeMap<String, String> = serde_json::from_str(&headers)?;

        Ok(Some(CachedResponse {
            status,
            status_text,
            headers,
            body,
        }))
    }

    /// Store `response` for `request`, replacing any previous entry
    pub fn put(&self, cache_name: &str, request: &Request, response: &CachedResponse) -> Result<()> {
        self.open_cache(cache_name)?;

        let key = request.key();
        let headers = serde_json::to_string(&response.headers)?;
        let now = Utc::now().timestamp();
        let size = response.body.len();

        // A previous body may have been a blob; replacing it inline would leak the file
        let previous_blob: Option<String> = self
            .conn
            .query_row(
                "SELECT blob_path FROM entries WHERE cache_name = ?1 AND request_key = ?2",
                params![cache_name, key],
                |r| r.get(0),
            )
            .optional()?
            .flatten();

        if size <= INLINE_THRESHOLD {
            self.conn.execute(
                "INSERT OR REPLACE INTO entries
                 (cache_name, request_key, method, url, status, status_text, headers,
                  body, blob_path, stored_at, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, ?10)",
                params![
                    cache_name,
                    key,
                    request.method.as_str(),
                    request.url.as_str(),
                    response.status,
                    response.status_text,
                    headers,
                    response.body,
                    now,
                    size
                ],
            )?;
            if let Some(blob) = previous_blob {
                self.remove_blob(&blob);
            }
        } else {
            let blob_path = self.write_blob(&blob_key(cache_name, &key), &response.body)?;
            let inserted = self.conn.execute(
                "INSERT OR REPLACE INTO entries
                 (cache_name, request_key, method, url, status, status_text, headers,
                  body, blob_path, stored_at, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?9, ?10)",
                params![
                    cache_name,
                    key,
                    request.method.as_str(),
                    request.url.as_str(),
                    response.status,
                    response.status_text,
                    headers,
                    blob_path,
                    now,
                    size
                ],
            );
            if let Err(e) = inserted {
                // No row points at the file, so it would never be reclaimed
                self.remove_blob(&blob_path);
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Delete the entry for `request` in `cache_name`
    pub fn delete(&self, cache_name: &str, request: &Request) -> Result<bool> {
        let key = request.key();
        let blob: Option<String> = self
            .conn
            .query_row(
                "SELECT blob_path FROM entries WHERE cache_name = ?1 AND request_key = ?2",
                params![cache_name, key],
                |r| r.get(0),
            )
            .optional()?
            .flatten();

        let deleted = self.conn.execute(
            "DELETE FROM entries WHERE cache_name = ?1 AND request_key = ?2",
            params![cache_name, key],
        )?;

        if let Some(blob) = blob {
            self.remove_blob(&blob);
        }
        Ok(deleted > 0)
    }

    /// Every stored request in a cache with its response metadata (no bodies)
    pub fn entry_heads(&self, cache_name: &str) -> Result<Vec<EntryHead>> {
        let mut stmt = self.conn.prepare(
            "SELECT method, url, status, status_text, headers, size_bytes FROM entries
             WHERE cache_name = ?1 ORDER BY url",
        )?;

        let rows = stmt
            .query_map([cache_name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u16>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut heads = Vec::with_capacity(rows.len());
        for (method, url, status, status_text, headers, size) in rows {
            let request = match Request::from_stored(&method, &url) {
                Some(request) => request,
                None => {
                    log::warn!("Skipping unreadable cache entry {} {}", method, url);
                    continue;
                }
            };
            heads.push(EntryHead {
                request,
                response: CachedResponse {
                    status,
                    status_text,
                    headers: serde_json::from_str(&headers)?,
                    body: Vec::new(),
                },
                size_bytes: size as usize,
            });
        }
        Ok(heads)
    }

    /// Load persisted limiter state for an action
    pub fn load_rate_limit(&self, action: &str) -> Result<Option<RateLimiterState>> {
        let state = self
            .conn
            .query_row(
                "SELECT count, reset_time FROM rate_limits WHERE action = ?1",
                [action],
                |r| {
                    Ok(RateLimiterState {
                        count: r.get(0)?,
                        reset_time: r.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(state)
    }

    /// Persist limiter state for an action
    pub fn save_rate_limit(&self, action: &str, state: &RateLimiterState) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO rate_limits (action, count, reset_time) VALUES (?1, ?2, ?3)",
            params![action, state.count, state.reset_time],
        )?;
        Ok(())
    }

    fn blob_paths(&self, cache_name: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT blob_path FROM entries WHERE cache_name = ?1 AND blob_path IS NOT NULL",
        )?;
        let paths = stmt
            .query_map([cache_name], |r| r.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(paths)
    }

    /// Write a blob file, sharded by first 2 chars of key
    fn write_blob(&self, key: &str, data: &[u8]) -> Result<String> {
        let shard = &key[..2.min(key.len())];
        let shard_dir = self.blobs_dir.join(shard);
        std::fs::create_dir_all(&shard_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create shard dir: {}", e)))?;

        let filename = format!("{}.bin", key);
        let rel_path = format!("{}/{}", shard, filename);
        let full_path = shard_dir.join(&filename);

        std::fs::write(&full_path, data)
            .map_err(|e| CacheError::Io(format!("Failed to write blob: {}", e)))?;

        Ok(rel_path)
    }

    fn remove_blob(&self, rel_path: &str) {
        if let Err(e) = std::fs::remove_file(self.blobs_dir.join(rel_path)) {
            log::debug!("Failed to remove blob {}: {}", rel_path, e);
        }
    }

    /// Nuke the cache (delete DB and all blobs)
    fn nuke(db_path: &Path, blobs_dir: &Path) -> Result<()> {
        if db_path.exists() {
            std::fs::remove_file(db_path)
                .map_err(|e| CacheError::Io(format!("Failed to remove cache DB: {}", e)))?;
        }
        if blobs_dir.exists() {
            std::fs::remove_dir_all(blobs_dir)
                .map_err(|e| CacheError::Io(format!("Failed to remove blobs dir: {}", e)))?;
        }
        Ok(())
    }
}
