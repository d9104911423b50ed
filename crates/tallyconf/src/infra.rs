//! Infrastructure configuration - things that cannot change at runtime.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Network bind addresses for this process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BindConfig {
    /// ZMQ REP address for statistics queries.
    /// Default: tcp://*:3333
    #[serde(default = "BindConfig::default_stats_endpoint")]
    pub stats_endpoint: String,
}

impl BindConfig {
    fn default_stats_endpoint() -> String {
        "tcp://*:3333".to_string()
    }
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            stats_endpoint: Self::default_stats_endpoint(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

/// Statistics endpoint switches.
///
/// Collection is not switchable here: each provider owns its counters and
/// keeps them whether or not anyone can query them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatisticsConfig {
    /// Bind the query endpoint. When false the daemon exits without binding.
    /// Default: true
    #[serde(default = "StatisticsConfig::default_enabled")]
    pub enabled: bool,

    /// Per-provider deadline in milliseconds while answering a query.
    /// 0 disables the deadline.
    /// Default: 0
    #[serde(default)]
    pub provider_timeout_ms: u64,
}

impl StatisticsConfig {
    fn default_enabled() -> bool {
        true
    }

    /// Per-provider deadline, if one is configured.
    pub fn provider_timeout(&self) -> Option<Duration> {
        match self.provider_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            provider_timeout_ms: 0,
        }
    }
}

/// Infrastructure configuration - cannot change at runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InfraConfig {
    /// Network bind addresses.
    #[serde(default)]
    pub bind: BindConfig,

    /// Logging settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Statistics endpoint settings.
    #[serde(default)]
    pub statistics: StatisticsConfig,
}
