//! Wire protocol for the bingo hall.
//!
//! This crate defines the "language" that players and the server speak:
//!
//! - **Card model** ([`Letter`], [`Cell`], [`BingoCard`], [`Draw`]):
//!   the data every other layer passes around.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]): the JSON
//!   objects that travel over the socket, tagged by `"type"`.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding
//!   or validating a message.
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (messages) → Room (game state)
//! ```
//!
//! The protocol layer doesn't know about connections or rooms. It only
//! knows the shape of a card and how to serialize messages.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    BingoCard, CARD_SIZE, CardLayout, Cell, ClaimRejection, ClientMessage, Draw, FREE_ROW,
    Letter, NumberStatus, PlayerId, Recipient, ServerMessage,
};
