//! `BingoServer` builder and accept loop.
//!
//! This is the entry point for running a bingo hall. It ties together
//! all the layers: transport → protocol → room.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bingo_protocol::JsonCodec;
use bingo_room::{RoomConfig, RoomHandle, spawn_room};

use crate::BingoError;
use crate::handler::handle_connection;
use crate::transport::{WebSocketConnection, WebSocketTransport};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) room: RoomHandle,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a bingo server.
///
/// # Example
///
/// ```rust,ignore
/// let server = BingoServer::builder()
///     .bind("0.0.0.0:8000")
///     .draw_interval(Duration::from_secs(3))
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct BingoServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl BingoServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole room configuration.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets the pause between draws.
    pub fn draw_interval(mut self, interval: Duration) -> Self {
        self.room_config.draw_interval = interval;
        self
    }

    /// Binds the listener and spawns the room.
    pub async fn build(self) -> Result<BingoServer, BingoError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let state = Arc::new(ServerState {
            room: spawn_room(self.room_config),
            codec: JsonCodec,
        });
        Ok(BingoServer { transport, state })
    }
}

impl Default for BingoServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound bingo server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct BingoServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl BingoServer {
    pub fn builder() -> BingoServerBuilder {
        BingoServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the server's room, for operator actions such as
    /// [`RoomHandle::new_game`].
    pub fn room(&self) -> RoomHandle {
        self.state.room.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), BingoError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then stops the room.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<(), BingoError> {
        tracing::info!("bingo server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let conn = match WebSocketConnection::upgrade(stream, peer).await {
                                Ok(conn) => conn,
                                Err(e) => {
                                    tracing::debug!(%peer, error = %e, "upgrade failed");
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("bingo server shutting down");
        // The room may already be gone; nothing left to clean up then.
        let _ = self.state.room.shutdown().await;
        Ok(())
    }
}
