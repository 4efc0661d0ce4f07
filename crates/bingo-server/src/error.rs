//! Error types for the server.

use bingo_protocol::ProtocolError;
use bingo_room::RoomError;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener or accepting a connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The WebSocket upgrade handshake failed.
    #[error("websocket handshake failed: {0}")]
    Handshake(#[source] tokio_tungstenite::tungstenite::Error),

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] tokio_tungstenite::tungstenite::Error),

    /// Receiving a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] tokio_tungstenite::tungstenite::Error),
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert layer errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum BingoError {
    /// A transport-level error (bind, handshake, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (full, unavailable, invalid state).
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use bingo_protocol::PlayerId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: BingoError = TransportError::AcceptFailed(io).into();
        assert!(matches!(err, BingoError::Transport(_)));
        assert!(err.to_string().contains("port taken"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: BingoError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, BingoError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err: BingoError = RoomError::NotInRoom(PlayerId(4)).into();
        assert!(matches!(err, BingoError::Room(_)));
        assert!(err.to_string().contains("P-4"));
    }
}
