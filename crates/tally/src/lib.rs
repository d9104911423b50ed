//! Tally - a statistics query daemon.
//!
//! Components register [`StatProvider`]s under a handle. Clients send small
//! JSON requests over a ZMQ REP socket and get one JSON reply each:
//!
//! ```text
//! {"version":1,"action":"info","handle":"all"}
//! {"ok":true,"data":{"svc-a":{...},"svc-b":{...}}}
//! ```

pub mod daemon;
pub mod dispatch;
pub mod error;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod server;
pub mod telemetry;

pub use daemon::Daemon;
pub use dispatch::{DispatchStats, Dispatcher};
pub use error::{ProviderError, QueryError, RegistryError};
pub use provider::{CacheStatsSource, SharedProvider, StatProvider};
pub use registry::{ProviderRegistry, RegistrySnapshot};
pub use server::{normalize_endpoint, ServerConfig, StatsServer};
