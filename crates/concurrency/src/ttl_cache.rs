//! A tiny read-through TTL cache in front of the active-version lookup path
//! (spec Design Notes: "a tiny TTL cache (≈10s)... must be read-through and
//! safe under concurrent fill").

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// A concurrent, read-through cache keyed by `K`, entries valid for `ttl`.
///
/// Concurrent fill is safe: two callers racing on a cold key both run
/// `load`, and both store their result — the cache is an optimization, not
/// a source of truth, so a harmless duplicate fill beats serializing every
/// miss behind a lock.
pub struct TtlCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    /// Build a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Return the cached value for `key` if present and unexpired;
    /// otherwise call `load`, cache its result, and return it.
    pub fn get_or_load<F>(&self, key: &K, load: F) -> V
    where
        F: FnOnce() -> V,
    {
        let now = Utc::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return entry.value.clone();
            }
        }
        let value = load();
        self.entries.insert(
            key.clone(),
            Entry {
                value: value.clone(),
                expires_at: now + chrono::Duration::from_std(self.ttl).unwrap_or_default(),
            },
        );
        value
    }

    /// Drop any cached value for `key`, forcing the next lookup to reload.
    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }
}
