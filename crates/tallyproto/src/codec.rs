//! JSON wire format for requests and responses.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::{Action, Request};
use crate::response::Response;
use crate::PROTOCOL_VERSION;

/// Errors decoding or encoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("unsupported protocol version {found} (supported: {supported})")]
    UnsupportedVersion { found: u64, supported: u32 },

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Error code reported in the `error` field of a reply.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "MalformedRequest",
            Self::UnsupportedVersion { .. } => "UnsupportedVersion",
            Self::MissingField(_) => "MissingField",
            Self::MalformedResponse(_) => "MalformedResponse",
            Self::Encode(_) => "EncodeError",
        }
    }
}

/// Request as it appears on the wire; every field may be missing.
#[derive(Debug, Deserialize)]
struct WireRequest {
    #[serde(default)]
    version: Option<u64>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    handle: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireRequestRef<'a> {
    version: u32,
    action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    handle: Option<&'a str>,
}

/// Decode a request frame.
///
/// A missing `version` means the current version. The version is checked
/// before `action` so an old client gets the more useful error.
pub fn decode(raw: &[u8]) -> Result<Request, ProtocolError> {
    let wire: WireRequest =
        serde_json::from_slice(raw).map_err(|e| ProtocolError::MalformedRequest(e.to_string()))?;

    let version = match wire.version {
        None => PROTOCOL_VERSION,
        Some(v) if v == u64::from(PROTOCOL_VERSION) => PROTOCOL_VERSION,
        Some(found) => {
            return Err(ProtocolError::UnsupportedVersion {
                found,
                supported: PROTOCOL_VERSION,
            })
        }
    };

    let action = wire.action.ok_or(ProtocolError::MissingField("action"))?;

    Ok(Request {
        version,
        action: Action::parse(&action),
        handle: wire.handle,
    })
}

/// Encode a reply frame.
pub fn encode(response: &Response) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(response)?)
}

/// Encode a request frame. `version` is always written.
pub fn encode_request(request: &Request) -> Result<Vec<u8>, ProtocolError> {
    let wire = WireRequestRef {
        version: request.version,
        action: request.action.as_str(),
        handle: request.handle.as_deref(),
    };
    Ok(serde_json::to_vec(&wire)?)
}

/// Decode a reply frame.
pub fn decode_response(raw: &[u8]) -> Result<Response, ProtocolError> {
    serde_json::from_slice(raw).map_err(|e| ProtocolError::MalformedResponse(e.to_string()))
}
