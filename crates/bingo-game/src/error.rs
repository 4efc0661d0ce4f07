//! Error types for the game rules.

/// Errors raised by the draw pool and history.
///
/// Both are guard rails: the room checks [`DrawPool::has_remaining`]
/// before drawing, and the pool never hands out a number twice, so
/// neither should surface during normal play.
///
/// [`DrawPool::has_remaining`]: crate::DrawPool::has_remaining
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Every number of every letter has already been drawn.
    #[error("draw pool is exhausted")]
    PoolExhausted,

    /// The number is already part of the draw history.
    #[error("number {0} was already drawn")]
    AlreadyDrawn(u8),
}
