//! Time-bounded cache of the external store list.
//!
//! Entries are JSON `{ "timestamp": <epoch ms>, "data": [StoreRecord] }`
//! written to an injectable [`KeyValueStore`]. Anything that fails to parse is
//! treated as a miss; cache problems never reach the caller.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use storefinder_core::StoreRecord;

const CACHE_KEY_PREFIX: &str = "nearbyStores";
const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// String key-value storage, the equivalent of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
}

/// Process-local storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
    }
}

/// One file per key inside a directory.
///
/// Read failures are misses and write failures are dropped, both logged.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read cache file");
                None
            }
        }
    }

    fn set(&self, key: &str, value: String) {
        let path = self.path_for(key);
        let result = std::fs::create_dir_all(&self.dir).and_then(|()| std::fs::write(&path, value));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "failed to write cache file");
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    timestamp: i64,
    data: Vec<StoreRecord>,
}

/// Cached external results for one query shape.
#[derive(Clone)]
pub struct StoreCache {
    store: Arc<dyn KeyValueStore>,
    key: String,
    ttl: Duration,
}

impl std::fmt::Debug for StoreCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCache")
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl StoreCache {
    /// Cache for nearby searches returning at most `limit` results, with a
    /// ten minute lifetime.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, limit: u32) -> Self {
        Self {
            store,
            key: format!("{CACHE_KEY_PREFIX}:limit={limit}"),
            ttl: DEFAULT_TTL,
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh cached records, or `None` on a miss.
    #[must_use]
    pub fn read(&self) -> Option<Vec<StoreRecord>> {
        self.read_at(now_ms())
    }

    /// Same as [`StoreCache::read`] with an explicit clock.
    ///
    /// An entry older than the TTL is a miss; an entry exactly TTL old is
    /// still served. An entry stamped after `now_ms` is a miss.
    #[must_use]
    pub fn read_at(&self, now_ms: i64) -> Option<Vec<StoreRecord>> {
        let raw = self.store.get(&self.key)?;
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(key = %self.key, error = %e, "ignoring malformed cache entry");
                return None;
            }
        };

        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let age_ms = now_ms.saturating_sub(entry.timestamp);
        if age_ms > ttl_ms {
            tracing::debug!(key = %self.key, age_ms, ttl_ms, "cache entry expired");
            return None;
        }
        if age_ms < 0 {
            tracing::debug!(key = %self.key, age_ms, "ignoring cache entry from the future");
            return None;
        }

        Some(entry.data)
    }

    /// Stores `records` stamped with the current time.
    pub fn write(&self, records: &[StoreRecord]) {
        self.write_at(records, now_ms());
    }

    pub fn write_at(&self, records: &[StoreRecord], now_ms: i64) {
        let entry = CacheEntry {
            timestamp: now_ms,
            data: records.to_vec(),
        };
        match serde_json::to_string(&entry) {
            Ok(raw) => self.store.set(&self.key, raw),
            Err(e) => tracing::warn!(key = %self.key, error = %e, "failed to encode cache entry"),
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
