//! Shared cache counters and the provider that reports them.
//!
//! A component that owns a cache keeps an `Arc<CacheCounters>` and bumps it
//! on every lookup. The provider side only ever reads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tallyproto::CacheStats;

use crate::error::ProviderError;
use crate::provider::{CacheStatsSource, StatProvider};

#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    size: AtomicU64,
}

impl CacheCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Current number of entries held.
    pub fn set_size(&self, size: u64) {
        self.size.store(size, Ordering::Relaxed);
    }

    /// Counters are read one at a time, so a snapshot taken during heavy
    /// traffic may be off by a few lookups between fields.
    pub fn snapshot(&self, capacity: Option<u64>) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.size.load(Ordering::Relaxed),
            capacity,
        }
    }
}

/// Provider for a component with a cache.
#[derive(Debug, Clone)]
pub struct CountingCacheProvider {
    description: String,
    counters: Arc<CacheCounters>,
    capacity: Option<u64>,
}

impl CountingCacheProvider {
    pub fn new(description: impl Into<String>, counters: Arc<CacheCounters>) -> Self {
        Self {
            description: description.into(),
            counters,
            capacity: None,
        }
    }

    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn counters(&self) -> &Arc<CacheCounters> {
        &self.counters
    }
}

#[async_trait]
impl StatProvider for CountingCacheProvider {
    async fn info(&self) -> Result<Value, ProviderError> {
        let stats = self.counters.snapshot(self.capacity);
        Ok(json!({
            "description": self.description,
            "entries": stats.size,
            "capacity": self.capacity,
            "hit_ratio": stats.hit_ratio(),
        }))
    }

    fn cache(&self) -> Option<&dyn CacheStatsSource> {
        Some(self)
    }
}

#[async_trait]
impl CacheStatsSource for CountingCacheProvider {
    async fn cache_stats(&self) -> Result<CacheStats, ProviderError> {
        Ok(self.counters.snapshot(self.capacity))
    }
}
