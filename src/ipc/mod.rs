//! Local control plane: one JSON event per TCP connection
//!
//! Accepts minimal HTTP (headers, blank line, JSON body) or bare JSON.
//! Each connection is read once, answered with a fixed `200 OK` and closed.
//! A message is assumed to arrive in a single segment; fragmented writes are
//! not reassembled.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

mod messages;
pub use messages::{decode, Payload, Request};

use crate::constants::server::{MAX_MESSAGE_SIZE, OK_RESPONSE};
use crate::presentation::EngineHandle;

/// Bound listener for agent events
pub struct ControlServer {
    listener: TcpListener,
}

impl ControlServer {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind control listener on {}", addr))?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read control listener address")
    }

    /// Accept forever, one task per connection
    pub async fn run(self, engine: EngineHandle) {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Usually transient (fd exhaustion, aborted handshake)
                    warn!(error = %e, "Failed to accept control connection");
                    continue;
                }
            };

            let engine = engine.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, &engine).await {
                    debug!(peer = %peer, error = ?e, "Control connection failed");
                }
            });
        }
    }
}

/// Bind and serve in the background; bind failure only disables live updates
pub fn spawn_listener(addr: SocketAddr, engine: EngineHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let server = match ControlServer::bind(addr).await {
            Ok(server) => server,
            Err(e) => {
                error!(error = ?e, "Control listener disabled, continuing without live updates");
                return;
            }
        };
        match server.local_addr() {
            Ok(bound) => info!(addr = %bound, "Control listener started"),
            Err(e) => warn!(error = ?e, "Control listener started on unknown address"),
        }
        server.run(engine).await;
    })
}

async fn handle_connection(mut stream: TcpStream, engine: &EngineHandle) -> Result<()> {
    let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
    let n = stream
        .read(&mut buf)
        .await
        .context("Failed to read control message")?;
    if n == 0 {
        return Ok(());
    }

    match decode(&buf[..n]) {
        Ok(request) => {
            debug!(request_type = %request.kind, bytes = n, "Received request");
            if !engine.submit(request) {
                warn!("Presentation engine stopped, dropping request");
            }
        }
        Err(e) => warn!(error = ?e, bytes = n, "Dropping malformed control message"),
    }

    stream
        .write_all(OK_RESPONSE)
        .await
        .context("Failed to write control response")?;
    stream
        .shutdown()
        .await
        .context("Failed to close control connection")?;
    Ok(())
}
