//! Small in-process TTL cache for read-heavy lookups.
//!
//! Values are stored as `serde_json::Value` so a single cache can hold
//! differently-typed entries under string keys. Writers invalidate the keys
//! they affect; readers fall back to the database on a miss and only store
//! the result if no invalidation happened while they were loading it.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Cache key for the inventory category list.
pub const KEY_INVENTORY_CATEGORIES: &str = "inventory:categories";

/// Cache key for the clinic-wide dashboard counters.
pub const KEY_DASHBOARD_COUNTS: &str = "dashboard:counts";

/// Cache key for the shift catalog.
pub const KEY_SHIFTS: &str = "scheduling:shifts";

/// Invalidation count of a key, read before the database query whose result
/// is about to be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

#[derive(Default)]
struct Inner {
    entries: HashMap<String, (Instant, serde_json::Value)>,
    generations: HashMap<String, u64>,
}

pub struct TtlCache {
    ttl: Duration,
    inner: RwLock<Inner>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Fetch a live entry. Expired or undecodable entries count as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let (stored_at, value) = inner.entries.get(key)?;
        if stored_at.elapsed() >= self.ttl {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn generation(&self, key: &str) -> Generation {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Generation(inner.generations.get(key).copied().unwrap_or(0))
    }

    /// Store `value` unless `key` was invalidated after `seen` was taken.
    pub fn insert<T: Serialize>(&self, key: &str, seen: Generation, value: &T) {
        let Ok(value) = serde_json::to_value(value) else {
            tracing::warn!(key, "Skipping cache insert: value did not serialize");
            return;
        };
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.generations.get(key).copied().unwrap_or(0) != seen.0 {
            tracing::debug!(key, "Skipping cache insert: invalidated during load");
            return;
        }
        inner.entries.insert(key.to_string(), (Instant::now(), value));
    }

    pub fn invalidate(&self, key: &str) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.entries.remove(key);
        *inner.generations.entry(key.to_string()).or_insert(0) += 1;
    }
}
