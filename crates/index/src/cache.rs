//! Query result cache.
//!
//! Maps a canonical form of a query vector (plus the strategy that served
//! it) to the ranked neighbor ids. Owned by the index manager, which clears
//! it on every mutation that can change rankings.

use crate::types::SearchStrategy;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hashable form of a query vector: IEEE-754 bit patterns with `-0.0`
/// folded into `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    strategy: SearchStrategy,
    bits: Vec<u32>,
}

impl QueryKey {
    pub fn new(strategy: SearchStrategy, vector: &[f32]) -> Self {
        let bits = vector
            .iter()
            .map(|&v| if v == 0.0 { 0.0f32.to_bits() } else { v.to_bits() })
            .collect();
        Self { strategy, bits }
    }
}

#[derive(Debug, Clone)]
struct CachedResult {
    /// Ranked ids, best first
    ids: Vec<String>,
    /// The k the ids were computed for
    k: usize,
}

impl CachedResult {
    fn serve(&self, k: usize) -> Option<Vec<String>> {
        // A short list means the index had no more candidates, so any k is answerable.
        let exhausted = self.ids.len() < self.k;
        (k <= self.k || exhausted).then(|| self.ids.iter().take(k).cloned().collect())
    }
}

/// Hit/miss counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self) -> CacheStatsReport {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStatsReport {
            hits,
            misses,
            invalidations: self.invalidations.load(Ordering::Relaxed),
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsReport {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
    pub hit_rate: f64,
}

pub struct QueryCache {
    /// `None` when caching is disabled
    entries: Option<LruCache<QueryKey, CachedResult>>,
    stats: CacheStats,
}

impl QueryCache {
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
            stats: CacheStats::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn get(&mut self, key: &QueryKey, k: usize) -> Option<Vec<String>> {
        let entries = self.entries.as_mut()?;
        let served = entries.get(key).and_then(|cached| cached.serve(k));

        match served {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        served
    }

    pub fn put(&mut self, key: QueryKey, k: usize, ids: Vec<String>) {
        if let Some(entries) = self.entries.as_mut() {
            entries.put(key, CachedResult { ids, k });
        }
    }

    pub fn invalidate_all(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            if !entries.is_empty() {
                tracing::debug!(entries = entries.len(), "Invalidating query cache");
            }
            entries.clear();
            self.stats.record_invalidation();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
