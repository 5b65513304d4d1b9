use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Hashes an ordered list of key parts into a stable hex cache key.
pub fn hash_key(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]); // separator so ["ab","c"] != ["a","bc"]
    }
    hex::encode(hasher.finalize())
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// An explicit `(key, value, expiry)` cache with eviction-on-read.
///
/// Expired entries are dropped the next time they are looked up or when
/// [`TtlCache::purge_expired`] runs; there is no background sweeper.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Creates a cache whose entries live for `ttl` after insertion.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Looks up a key, evicting it first if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Inserts or replaces a value under the configured TTL.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let mut entries = self.entries.lock();
        entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Removes every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.lock().retain(|_, e| e.expires_at > now);
    }

    /// Number of entries, including any not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
