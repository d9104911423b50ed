//! Wires config, registry, dispatcher and listener together.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tallyconf::TallyConfig;
use tracing::info;

use crate::dispatch::Dispatcher;
use crate::providers::{DaemonProvider, ServiceInfoProvider, DAEMON_HANDLE};
use crate::registry::ProviderRegistry;
use crate::server::{ServerConfig, StatsServer};

pub struct Daemon {
    config: TallyConfig,
    registry: Arc<ProviderRegistry>,
    dispatcher: Arc<Dispatcher>,
}

impl Daemon {
    /// Build the registry from config: the daemon's own provider under
    /// `tally`, then one provider per configured service.
    pub fn new(config: TallyConfig) -> Result<Self> {
        let registry = Arc::new(ProviderRegistry::new());

        let dispatcher = Dispatcher::new(Arc::clone(&registry))
            .with_provider_timeout(config.infra.statistics.provider_timeout())
            .with_config_view(config_view(&config)?);

        let daemon_provider = DaemonProvider::new(dispatcher.stats(), &registry);
        registry.register(DAEMON_HANDLE, Arc::new(daemon_provider))?;

        for (name, entry) in &config.services {
            registry
                .register(name.clone(), Arc::new(ServiceInfoProvider::new(entry.clone())))
                .with_context(|| format!("failed to register service '{}'", name))?;
        }
        info!("registered {} providers", registry.len());

        Ok(Self {
            config,
            registry,
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn config(&self) -> &TallyConfig {
        &self.config
    }

    /// Providers may be added or removed here while the server runs.
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Bind the listener at the configured endpoint.
    pub async fn bind(&self) -> Result<StatsServer> {
        let server_config = ServerConfig {
            bind_address: self.config.infra.bind.stats_endpoint.clone(),
        };
        StatsServer::bind(&server_config, Arc::clone(&self.dispatcher)).await
    }
}

fn config_view(config: &TallyConfig) -> Result<Map<String, Value>> {
    match serde_json::to_value(config).context("failed to serialize config")? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}
