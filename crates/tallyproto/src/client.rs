//! REQ client for the statistics endpoint.
//!
//! A REQ socket that misses a reply is stuck: it refuses to send again until
//! it receives. On timeout the socket is thrown away and a fresh one is
//! connected, the same recovery the zguide calls Lazy Pirate, minus retries.
//! Retrying a stats query is the caller's call.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use zeromq::{ReqSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

use crate::codec::{decode_response, encode_request};
use crate::request::Request;
use crate::response::Response;

/// Default time to wait for a reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client side of the statistics endpoint.
pub struct StatsClient {
    endpoint: String,
    socket: ReqSocket,
    timeout: Duration,
}

impl StatsClient {
    /// Connect to a running daemon, e.g. `tcp://localhost:3333`.
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let socket = Self::open(endpoint).await?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            socket,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a request and wait for its reply.
    pub async fn query(&mut self, request: &Request) -> Result<Response> {
        let bytes = encode_request(request).context("failed to encode request")?;
        debug!("query {} handle={:?}", request.action, request.handle);
        self.send_raw(bytes).await
    }

    /// Send an arbitrary frame and decode whatever comes back.
    ///
    /// Useful for poking the daemon with hand-written or deliberately broken
    /// requests.
    pub async fn send_raw(&mut self, frame: Vec<u8>) -> Result<Response> {
        self.socket
            .send(ZmqMessage::from(frame))
            .await
            .with_context(|| format!("failed to send request to {}", self.endpoint))?;

        let reply = match tokio::time::timeout(self.timeout, self.socket.recv()).await {
            Ok(reply) => {
                reply.with_context(|| format!("failed to receive reply from {}", self.endpoint))?
            }
            Err(_) => {
                warn!(
                    "no reply from {} within {:?}, reconnecting",
                    self.endpoint, self.timeout
                );
                self.reconnect().await?;
                anyhow::bail!("no reply from {} within {:?}", self.endpoint, self.timeout);
            }
        };

        let data = reply.into_vec().pop().context("empty reply")?;
        let response = decode_response(&data)?;
        Ok(response)
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.socket = Self::open(&self.endpoint).await?;
        Ok(())
    }

    async fn open(endpoint: &str) -> Result<ReqSocket> {
        let mut socket = ReqSocket::new();
        socket
            .connect(endpoint)
            .await
            .with_context(|| format!("failed to connect stats socket to {}", endpoint))?;
        Ok(socket)
    }
}
