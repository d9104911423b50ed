//! Statistics provider capabilities.
//!
//! Every provider reports `info`. Providers that own a cache also expose the
//! cache capability through [`StatProvider::cache`]; the dispatcher asks for
//! it explicitly and skips providers that return `None`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tallyproto::CacheStats;

use crate::error::ProviderError;

/// A named, queryable statistics source.
#[async_trait]
pub trait StatProvider: Send + Sync {
    /// Generic description and counters of this provider.
    async fn info(&self) -> Result<Value, ProviderError>;

    /// Cache capability, if this provider has a cache.
    fn cache(&self) -> Option<&dyn CacheStatsSource> {
        None
    }
}

/// Cache capability.
#[async_trait]
pub trait CacheStatsSource: Send + Sync {
    async fn cache_stats(&self) -> Result<CacheStats, ProviderError>;
}

/// Providers are shared between the registry and in-flight snapshots.
pub type SharedProvider = Arc<dyn StatProvider>;
