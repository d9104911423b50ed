//! The daemon reporting on itself under the `tally` handle.

use std::sync::{Arc, Weak};
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::dispatch::DispatchStats;
use crate::error::ProviderError;
use crate::provider::StatProvider;
use crate::registry::ProviderRegistry;

/// Handle the daemon registers itself under.
pub const DAEMON_HANDLE: &str = "tally";

/// Reports on the daemon itself.
///
/// Holds the registry weakly; the registry owns this provider.
#[derive(Debug)]
pub struct DaemonProvider {
    started: Instant,
    stats: Arc<DispatchStats>,
    registry: Weak<ProviderRegistry>,
}

impl DaemonProvider {
    pub fn new(stats: Arc<DispatchStats>, registry: &Arc<ProviderRegistry>) -> Self {
        Self {
            started: Instant::now(),
            stats,
            registry: Arc::downgrade(registry),
        }
    }
}

#[async_trait]
impl StatProvider for DaemonProvider {
    async fn info(&self) -> Result<Value, ProviderError> {
        let providers = self
            .registry
            .upgrade()
            .map(|registry| registry.len())
            .ok_or_else(|| ProviderError::failed("registry dropped"))?;

        Ok(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_secs": self.started.elapsed().as_secs(),
            "requests_served": self.stats.served(),
            "requests_failed": self.stats.failed(),
            "providers": providers,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Dispatcher;
    use tallyproto::Request;

    #[tokio::test]
    async fn test_reports_requests_and_providers() {
        let registry = Arc::new(ProviderRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        let provider = DaemonProvider::new(dispatcher.stats(), &registry);
        registry
            .register(DAEMON_HANDLE, Arc::new(provider))
            .unwrap();

        dispatcher.handle_frame(br#"{"action":"all_services"}"#).await;
        dispatcher.handle_frame(b"not json").await;

        let response = dispatcher.dispatch(&Request::info(DAEMON_HANDLE)).await;
        let info = &response.data.unwrap()[DAEMON_HANDLE];

        assert_eq!(info["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(info["requests_served"], 2);
        assert_eq!(info["requests_failed"], 1);
        assert_eq!(info["providers"], 1);
    }

    #[tokio::test]
    async fn test_fails_once_registry_is_gone() {
        let registry = Arc::new(ProviderRegistry::new());
        let provider = DaemonProvider::new(Arc::default(), &registry);
        drop(registry);

        assert!(provider.info().await.is_err());
    }
}
