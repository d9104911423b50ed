//! Query replies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Reply to exactly one request.
///
/// On success `data` is set (plus `errors` when some providers failed during
/// an aggregate); on failure `error` carries the error code and `detail` a
/// readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,

    /// Per-handle failure notes from a partially failed aggregate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Response {
    pub fn success(data: Map<String, Value>) -> Self {
        Self {
            ok: true,
            data: Some(data),
            errors: None,
            error: None,
            detail: None,
        }
    }

    /// Success that also reports providers left out of `data`.
    /// An empty `errors` map is dropped.
    pub fn partial(data: Map<String, Value>, errors: BTreeMap<String, String>) -> Self {
        let mut response = Self::success(data);
        if !errors.is_empty() {
            response.errors = Some(errors);
        }
        response
    }

    pub fn failure(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            errors: None,
            error: Some(code.into()),
            detail: Some(detail.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Error code of a failed response.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Cache counters reported by providers with a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Entries currently held.
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u64>,
}

impl CacheStats {
    /// Fraction of lookups that hit, or `None` before the first lookup.
    pub fn hit_ratio(&self) -> Option<f64> {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            None
        } else {
            Some(self.hits as f64 / lookups as f64)
        }
    }
}
