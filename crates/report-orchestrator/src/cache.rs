use chrono::{DateTime, Utc};
use dashmap::DashMap;
use finsight_core::Ticker;
use std::sync::Arc;

use crate::config::TickerCacheConfig;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// Company name -> ticker cache with a TTL and a hard capacity.
///
/// Only successful resolutions are cached. Keys are case- and
/// whitespace-insensitive.
#[derive(Clone)]
pub struct TickerCache {
    entries: Arc<DashMap<String, CacheEntry<Ticker>>>,
    ttl_secs: i64,
    capacity: usize,
}

impl TickerCache {
    pub fn new(config: TickerCacheConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl_secs: i64::try_from(config.ttl.as_secs()).unwrap_or(i64::MAX),
            capacity: config.capacity.max(1),
        }
    }

    fn key(name: &str) -> String {
        name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }

    fn is_fresh(&self, cached_at: DateTime<Utc>) -> bool {
        (Utc::now() - cached_at).num_seconds() < self.ttl_secs
    }

    pub fn get(&self, name: &str) -> Option<Ticker> {
        let key = Self::key(name);
        if let Some(entry) = self.entries.get(&key) {
            if self.is_fresh(entry.cached_at) {
                return Some(entry.data.clone());
            }
        }
        // expired: drop it so it doesn't hold a slot
        self.entries.remove_if(&key, |_, e| !self.is_fresh(e.cached_at));
        None
    }

    pub fn insert(&self, name: &str, ticker: Ticker) {
        let key = Self::key(name);
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict();
        }
        self.entries.insert(
            key,
            CacheEntry {
                data: ticker,
                cached_at: Utc::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries; if still full, drop the oldest one.
    fn evict(&self) {
        self.entries.retain(|_, e| self.is_fresh(e.cached_at));
        if self.entries.len() < self.capacity {
            return;
        }

        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().cached_at)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}
