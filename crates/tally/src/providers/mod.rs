//! Built-in statistics providers.

mod cache;
mod daemon;
mod service;

pub use cache::{CacheCounters, CountingCacheProvider};
pub use daemon::{DaemonProvider, DAEMON_HANDLE};
pub use service::ServiceInfoProvider;
