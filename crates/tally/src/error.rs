//! Error taxonomy for the statistics daemon.
//!
//! Every error that can happen while answering a query ends up as a
//! [`Response`] with `ok: false`; nothing here is allowed to take down the
//! listener.

use std::time::Duration;

use tallyproto::{ProtocolError, Response};
use thiserror::Error;

/// A provider could not produce its statistics.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Failed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("panicked: {0}")]
    Panicked(String),
}

impl ProviderError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Registry mutations and lookups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("handle '{0}' is already registered")]
    DuplicateHandle(String),

    #[error("unknown handle '{0}'")]
    UnknownHandle(String),
}

impl RegistryError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateHandle(_) => "DuplicateHandle",
            Self::UnknownHandle(_) => "UnknownHandle",
        }
    }
}

/// Why a query was answered with an error response.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("unknown handle '{0}'")]
    UnknownHandle(String),

    #[error("provider '{handle}' failed: {source}")]
    ProviderFailure {
        handle: String,
        #[source]
        source: ProviderError,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Error code reported in the `error` field of a reply.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Protocol(e) => e.code(),
            Self::UnknownAction(_) => "UnknownAction",
            Self::UnknownHandle(_) => "UnknownHandle",
            Self::ProviderFailure { .. } => "ProviderFailure",
            Self::Internal(_) => "InternalError",
        }
    }

    pub fn into_response(self) -> Response {
        Response::failure(self.code(), self.to_string())
    }
}

impl From<RegistryError> for QueryError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownHandle(handle) => Self::UnknownHandle(handle),
            other => Self::Internal(other.to_string()),
        }
    }
}
