//! StatsServer - the ZMQ REP listener.
//!
//! One socket, one request at a time: receive, dispatch, reply, repeat.
//! Every received request gets exactly one reply, whatever went wrong while
//! producing it.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use zeromq::{RepSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

use crate::dispatch::Dispatcher;

/// Sent when even the error response cannot be encoded.
const FALLBACK_REPLY: &[u8] = br#"{"ok":false,"error":"InternalError"}"#;

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "tcp://*:3333".to_string(),
        }
    }
}

/// Rewrite the `*` wildcard host to `0.0.0.0` for binding.
pub fn normalize_endpoint(endpoint: &str) -> String {
    match endpoint.split_once("://") {
        Some((scheme, rest)) if rest.starts_with("*:") => {
            format!("{}://0.0.0.0{}", scheme, &rest[1..])
        }
        _ => endpoint.to_string(),
    }
}

pub struct StatsServer {
    socket: RepSocket,
    endpoint: String,
    dispatcher: Arc<Dispatcher>,
}

impl StatsServer {
    /// Bind the REP socket. Port 0 picks a free port; see [`Self::endpoint`].
    pub async fn bind(config: &ServerConfig, dispatcher: Arc<Dispatcher>) -> Result<Self> {
        let address = normalize_endpoint(&config.bind_address);

        let mut socket = RepSocket::new();
        let endpoint = socket
            .bind(&address)
            .await
            .with_context(|| format!("failed to bind stats socket to {}", address))?;
        let endpoint = endpoint.to_string();
        info!("stats socket bound to {}", endpoint);

        Ok(Self {
            socket,
            endpoint,
            dispatcher,
        })
    }

    /// The endpoint actually bound, with the resolved port.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Serve until a shutdown signal arrives.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!("stats server ready on {}", self.endpoint);

        loop {
            tokio::select! {
                result = self.socket.recv() => {
                    match result {
                        Ok(msg) => {
                            if let Err(e) = self.serve_one(msg).await {
                                error!("error replying to stats request: {}", e);
                            }
                        }
                        Err(e) => {
                            warn!("stats socket error: {}", e);
                        }
                    }
                }

                _ = shutdown.recv() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        info!("stats server shutting down");
        Ok(())
    }

    async fn serve_one(&mut self, msg: ZmqMessage) -> Result<()> {
        let frame = msg.into_vec().pop().unwrap_or_default();
        debug!("stats request: {} bytes", frame.len());

        let response = self.dispatcher.handle_frame(&frame).await;

        let reply = match tallyproto::encode(&response) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("failed to encode response: {}", e);
                FALLBACK_REPLY.to_vec()
            }
        };

        self.socket
            .send(ZmqMessage::from(reply))
            .await
            .context("failed to send stats reply")?;

        Ok(())
    }
}
