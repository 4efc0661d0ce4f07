//! The draw history: numbers already called.

use std::collections::HashSet;

use bingo_protocol::Draw;

use crate::GameError;

/// Ordered record of a game's draws plus the set of drawn numbers.
///
/// The set is letter-independent because a card cell only stores the
/// number. No number may appear twice.
#[derive(Debug, Clone, Default)]
pub struct DrawHistory {
    draws: Vec<Draw>,
    drawn: HashSet<u8>,
}

impl DrawHistory {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a draw and returns its 1-based sequence number.
    ///
    /// # Errors
    /// Returns [`GameError::AlreadyDrawn`] if the number is already recorded.
    pub fn record(&mut self, draw: Draw) -> Result<usize, GameError> {
        if !self.drawn.insert(draw.number) {
            return Err(GameError::AlreadyDrawn(draw.number));
        }
        self.draws.push(draw);
        Ok(self.draws.len())
    }

    /// Whether `number` has been drawn.
    pub fn contains(&self, number: u8) -> bool {
        self.drawn.contains(&number)
    }

    /// All drawn numbers, for win checking.
    pub fn drawn_numbers(&self) -> &HashSet<u8> {
        &self.drawn
    }

    /// Draws in the order they were made.
    pub fn draws(&self) -> &[Draw] {
        &self.draws
    }

    /// The most recent draw.
    pub fn last(&self) -> Option<Draw> {
        self.draws.last().copied()
    }

    /// Number of draws so far.
    pub fn len(&self) -> usize {
        self.draws.len()
    }

    /// `true` before the first draw.
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Forgets every draw, ready for a new game.
    pub fn clear(&mut self) {
        self.draws.clear();
        self.drawn.clear();
    }
}
