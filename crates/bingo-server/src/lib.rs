//! # Bingo hall server
//!
//! Serves one bingo room over WebSocket. Every connection becomes a
//! participant: it is dealt a card on connect, receives every draw as it
//! happens, and may ask whether a number was drawn or claim a win.
//!
//! ```text
//! WebSocket (frames) → JSON (ClientMessage) → Room actor → events → JSON → WebSocket
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bingo_server::BingoServer;
//!
//! # async fn run() -> Result<(), bingo_server::BingoError> {
//! let server = BingoServer::builder()
//!     .bind("0.0.0.0:8000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;
mod transport;

pub use error::{BingoError, TransportError};
pub use server::{BingoServer, BingoServerBuilder};
pub use transport::{ConnectionId, WebSocketConnection, WebSocketTransport};
