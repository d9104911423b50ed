//! Minimal configuration loading for Tally.
//!
//! Tally is a small statistics daemon: it binds one ZMQ REP endpoint and
//! answers JSON queries about the services and caches registered with it.
//!
//! # Configuration Philosophy
//!
//! Configuration is split into two categories:
//!
//! - **Infrastructure** (`InfraConfig`): bind address, telemetry and the
//!   statistics switches. Fixed for the lifetime of the process.
//!
//! - **Services** (`ServicesConfig`): discovery services described in config.
//!   Each one is registered as a statistics provider at startup; providers
//!   may come and go at runtime after that.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tallyconf::TallyConfig;
//!
//! let config = TallyConfig::load().expect("Failed to load config");
//!
//! println!("stats endpoint: {}", config.infra.bind.stats_endpoint);
//! for (name, service) in &config.services {
//!     println!("service {}: {}", name, service.description);
//! }
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/tally/config.toml` (system)
//! 2. `~/.config/tally/config.toml` (user)
//! 3. `./tally.toml` (local override)
//! 4. Environment variables (`TALLY_*`)
//!
//! # Example Config
//!
//! ```toml
//! [bind]
//! stats_endpoint = "tcp://*:3333"
//!
//! [telemetry]
//! log_level = "info"
//!
//! [statistics]
//! enabled = true
//! provider_timeout_ms = 2000
//!
//! [services.audio]
//! app_name = "audio@1"
//! description = "audio transcoding"
//! instance = "main"
//! hosts_url = "http://localhost/hosts"
//! control_port = 5000
//! ```

pub mod infra;
pub mod loader;
pub mod services;

pub use infra::{BindConfig, InfraConfig, StatisticsConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use services::{ServiceEntry, ServicesConfig};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete Tally configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TallyConfig {
    /// Infrastructure - cannot change at runtime.
    #[serde(flatten)]
    pub infra: InfraConfig,

    /// Discovery services registered as providers at startup.
    #[serde(default)]
    pub services: ServicesConfig,
}

impl TallyConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/tally/config.toml`
    /// 3. `~/.config/tally/config.toml`
    /// 4. `./tally.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    ///
    /// If `config_path` is provided, it takes precedence over the local
    /// `./tally.toml` override. System and user configs still load first.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let files = loader::discover_config_files_with_override(config_path);
        let (mut config, mut sources) = loader::load_files(&files)?;

        loader::apply_env_overrides(&mut config, &mut sources, |key| std::env::var(key).ok());

        Ok((config, sources))
    }

    /// Serialize config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let body = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("cannot serialize config: {}", e)))?;
        Ok(format!("# Tally Configuration\n\n{}", body))
    }
}
