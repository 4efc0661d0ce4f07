//! Error types for the protocol layer.
//!
//! Each crate in the hall defines its own error enum. A `ProtocolError`
//! always means the bytes or the shape of a message were wrong, never
//! that a game rule was broken.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, an unknown `"type"` tag, or a
    /// number that doesn't fit in a card cell.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but violates the card shape, e.g. a column
    /// with four cells or a `Free` cell outside the centre square.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
