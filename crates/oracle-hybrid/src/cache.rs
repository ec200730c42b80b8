//! Process-local result cache keyed by request fingerprint.
//!
//! Entries expire after a fixed TTL (removed lazily on lookup). When full, the
//! oldest tenth of the entries by insertion time is evicted in one batch.
//! A poisoned lock degrades every operation to a miss or a no-op.
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use oracle_core::config::RetrievalConfig;
use oracle_core::types::Source;

use crate::fingerprint::Fingerprint;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    sources: Vec<Source>,
    timestamp: Instant,
    access_count: u64,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool { now.saturating_duration_since(self.timestamp) > ttl }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub cache_enabled: bool,
    pub cache_size: usize,
    pub max_cache_size: usize,
    pub cache_ttl_secs: u64,
    pub total_access_count: u64,
    pub average_access_count: f64,
}

pub struct SourceCache {
    enabled: bool,
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<Fingerprint, CacheEntry>>,
}

impl SourceCache {
    pub fn new(enabled: bool, ttl: Duration, capacity: usize) -> Self {
        Self { enabled, ttl, capacity: capacity.max(1), entries: Mutex::new(HashMap::new()) }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.cache_enabled, config.cache_ttl(), config.max_cache_size)
    }

    pub fn is_enabled(&self) -> bool { self.enabled }

    /// A copy of the stored sources, or `None` on miss or expiry.
    pub fn lookup(&self, key: &Fingerprint) -> Option<Vec<Source>> { self.lookup_at(key, Instant::now()) }

    pub(crate) fn lookup_at(&self, key: &Fingerprint, now: Instant) -> Option<Vec<Source>> {
        if !self.enabled { return None; }
        let mut entries = self.entries()?;
        if entries.get(key)?.is_expired(self.ttl, now) {
            entries.remove(key);
            debug!(cache_key = %key, "Cache entry expired");
            return None;
        }
        let entry = entries.get_mut(key)?;
        entry.access_count += 1;
        debug!(cache_key = %key, access_count = entry.access_count, "Cache hit");
        Some(entry.sources.clone())
    }

    pub fn store(&self, key: Fingerprint, sources: Vec<Source>) { self.store_at(key, sources, Instant::now()) }

    pub(crate) fn store_at(&self, key: Fingerprint, sources: Vec<Source>, now: Instant) {
        if !self.enabled { return; }
        let Some(mut entries) = self.entries() else { return };
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let evicted = evict_oldest(&mut entries);
            debug!(evicted, "Evicted oldest cache entries");
        }
        debug!(cache_key = %key, sources = sources.len(), "Stored in cache");
        entries.insert(key, CacheEntry { sources, timestamp: now, access_count: 0 });
    }

    /// Empties the cache and returns how many entries were removed.
    pub fn clear(&self) -> usize {
        let Some(mut entries) = self.entries() else { return 0 };
        let cleared = entries.len();
        entries.clear();
        info!(entries_cleared = cleared, "Cleared knowledge cache");
        cleared
    }

    pub fn len(&self) -> usize { self.entries().map_or(0, |e| e.len()) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn stats(&self) -> CacheStats {
        let (size, total) = self
            .entries()
            .map_or((0, 0), |e| (e.len(), e.values().map(|v| v.access_count).sum::<u64>()));
        CacheStats {
            cache_enabled: self.enabled,
            cache_size: size,
            max_cache_size: self.capacity,
            cache_ttl_secs: self.ttl.as_secs(),
            total_access_count: total,
            average_access_count: if size == 0 { 0.0 } else { total as f64 / size as f64 },
        }
    }

    fn entries(&self) -> Option<MutexGuard<'_, HashMap<Fingerprint, CacheEntry>>> {
        match self.entries.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!("Cache lock poisoned; treating as a miss");
                None
            }
        }
    }
}

/// Removes `max(1, len / 10)` entries with the oldest timestamps.
fn evict_oldest(entries: &mut HashMap<Fingerprint, CacheEntry>) -> usize {
    let mut by_age: Vec<(Instant, Fingerprint)> = entries.iter().map(|(k, v)| (v.timestamp, k.clone())).collect();
    by_age.sort_by_key(|(ts, _)| *ts);
    let count = (by_age.len() / 10).max(1);
    for (_, key) in by_age.into_iter().take(count) {
        entries.remove(&key);
    }
    count
}
