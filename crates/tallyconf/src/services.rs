//! Discovery services described in config.
//!
//! These seed the provider registry at startup. After that the registry is
//! the source of truth: services may attach or detach without touching config.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Services keyed by their handle.
pub type ServicesConfig = BTreeMap<String, ServiceEntry>;

/// Static description of one discovery service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceEntry {
    /// Application the service resolves to, e.g. `audio@1`.
    #[serde(default)]
    pub app_name: String,

    #[serde(default)]
    pub description: String,

    /// Instance name inside the application.
    #[serde(default)]
    pub instance: String,

    /// URL returning the list of hosts that run this service.
    #[serde(default)]
    pub hosts_url: String,

    /// Port the service listens on for control messages.
    #[serde(default)]
    pub control_port: u16,
}
