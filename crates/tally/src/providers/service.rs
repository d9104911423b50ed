//! One provider per `[services.<name>]` config entry.

use async_trait::async_trait;
use serde_json::Value;
use tallyconf::ServiceEntry;

use crate::error::ProviderError;
use crate::provider::StatProvider;

/// Reports the configured description of one discovery service.
#[derive(Debug, Clone)]
pub struct ServiceInfoProvider {
    entry: ServiceEntry,
}

impl ServiceInfoProvider {
    pub fn new(entry: ServiceEntry) -> Self {
        Self { entry }
    }

    pub fn entry(&self) -> &ServiceEntry {
        &self.entry
    }
}

#[async_trait]
impl StatProvider for ServiceInfoProvider {
    async fn info(&self) -> Result<Value, ProviderError> {
        serde_json::to_value(&self.entry).map_err(|e| ProviderError::failed(e.to_string()))
    }
}
