//! WebSocket transport using `tokio-tungstenite`.
//!
//! The TCP accept and the WebSocket upgrade are separate steps so a slow
//! client handshake never holds up the accept loop. Once upgraded, a
//! connection is split into a [`FrameWriter`] and a [`FrameReader`] so
//! the handler can wait on the socket and on room events at the same time.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::TransportError;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Listens for incoming TCP connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a listener to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next TCP connection. The upgrade happens in
    /// [`WebSocketConnection::upgrade`].
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), TransportError> {
        self.listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)
    }
}

/// A single upgraded WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    ws: WsStream,
}

impl WebSocketConnection {
    /// Performs the WebSocket handshake on an accepted TCP stream.
    pub async fn upgrade(stream: TcpStream, peer: SocketAddr) -> Result<Self, TransportError> {
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(TransportError::Handshake)?;
        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "accepted WebSocket connection");
        Ok(Self { id, peer, ws })
    }

    /// The connection's process-unique id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The remote address of the client.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Splits the connection into independently usable halves.
    pub(crate) fn into_split(self) -> (FrameWriter, FrameReader) {
        let (sink, stream) = self.ws.split();
        (FrameWriter { sink }, FrameReader { stream })
    }
}

/// Sending half of a connection.
pub(crate) struct FrameWriter {
    sink: SplitSink<WsStream, Message>,
}

impl FrameWriter {
    /// Sends an encoded message. UTF-8 payloads go out as text frames,
    /// anything else as binary.
    pub(crate) async fn send(&mut self, data: Vec<u8>) -> Result<(), TransportError> {
        let msg = match String::from_utf8(data) {
            Ok(text) => Message::text(text),
            Err(e) => Message::binary(e.into_bytes()),
        };
        self.sink
            .send(msg)
            .await
            .map_err(TransportError::SendFailed)
    }

    /// Sends a close frame. Errors are ignored; the peer may already be gone.
    pub(crate) async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}

/// Receiving half of a connection.
pub(crate) struct FrameReader {
    stream: SplitStream<WsStream>,
}

impl FrameReader {
    /// Receives the next data frame.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed. Control
    /// frames are skipped. Cancel-safe.
    pub(crate) async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_bytes().to_vec())),
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => return Err(TransportError::ReceiveFailed(e)),
            }
        }
    }
}
