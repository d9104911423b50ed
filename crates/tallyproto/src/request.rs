//! Query requests.

use std::fmt;

use crate::PROTOCOL_VERSION;

/// Handle sentinel meaning "every registered provider".
pub const HANDLE_ALL: &str = "all";

/// Operation selected by a request.
///
/// Unrecognised spellings are kept in [`Action::Other`] so a request always
/// decodes; the dispatcher is the one that rejects them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Info of every provider, keyed by handle.
    AllServices,
    /// Info of one provider, or of all of them for handle `all`.
    Info,
    /// Cache counters of every provider that has a cache.
    CacheStats,
    /// Effective daemon configuration.
    Config,
    /// Any other spelling, kept verbatim so it can be reported back.
    Other(String),
}

impl Action {
    /// Parse an action name. Matching is exact and case-sensitive.
    pub fn parse(value: &str) -> Self {
        match value {
            "all_services" => Self::AllServices,
            "info" => Self::Info,
            "cache_stats" => Self::CacheStats,
            "config" => Self::Config,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire spelling.
    pub fn as_str(&self) -> &str {
        match self {
            Self::AllServices => "all_services",
            Self::Info => "info",
            Self::CacheStats => "cache_stats",
            Self::Config => "config",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Action {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// A decoded query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub version: u32,
    pub action: Action,
    /// Provider handle, or [`HANDLE_ALL`].
    pub handle: Option<String>,
}

impl Request {
    pub fn new(action: impl Into<Action>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            action: action.into(),
            handle: None,
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn all_services() -> Self {
        Self::new(Action::AllServices)
    }

    pub fn info(handle: impl Into<String>) -> Self {
        Self::new(Action::Info).with_handle(handle)
    }

    pub fn cache_stats() -> Self {
        Self::new(Action::CacheStats)
    }

    pub fn config() -> Self {
        Self::new(Action::Config)
    }

    /// True when the handle is absent or the `all` sentinel.
    pub fn targets_all(&self) -> bool {
        matches!(self.handle.as_deref(), None | Some(HANDLE_ALL))
    }
}
