//! Tally query protocol.
//!
//! One JSON object per ZMQ message, one reply per request:
//!
//! ```text
//! -> {"version": 1, "action": "all_services"}
//! <- {"ok": true, "data": {"audio": {...}, "video": {...}}}
//!
//! -> {"action": "info", "handle": "nope"}
//! <- {"ok": false, "error": "UnknownHandle", "detail": "unknown handle 'nope'"}
//! ```
//!
//! `version` may be omitted and then means [`PROTOCOL_VERSION`]. Any other
//! version is rejected. The `error` field always carries a bare error code so
//! scripts can match on it; `detail` is for humans.

pub mod codec;
pub mod request;
pub mod response;

#[cfg(feature = "client")]
pub mod client;

pub use codec::{decode, decode_response, encode, encode_request, ProtocolError};
pub use request::{Action, Request, HANDLE_ALL};
pub use response::{CacheStats, Response};

#[cfg(feature = "client")]
pub use client::StatsClient;

/// The only protocol revision this crate speaks.
pub const PROTOCOL_VERSION: u32 = 1;

/// Default client endpoint.
pub const DEFAULT_ENDPOINT: &str = "tcp://localhost:3333";
