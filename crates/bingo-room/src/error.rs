//! Error types for the room layer.
//!
//! Losing claims and an exhausted pool are not errors; they come back
//! as [`ClaimOutcome`](crate::ClaimOutcome) values and room events.

use bingo_protocol::PlayerId;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The participant is already registered.
    #[error("player {0} already in room")]
    AlreadyInRoom(PlayerId),

    /// The participant never joined, or already left.
    #[error("player {0} not in room")]
    NotInRoom(PlayerId),

    /// No more participant slots.
    #[error("room is full ({0} players)")]
    RoomFull(usize),

    /// The room is in a state that doesn't allow this operation,
    /// e.g. starting a new game while one is still drawing.
    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),

    /// The room actor has shut down.
    #[error("room is unavailable")]
    Unavailable,
}
