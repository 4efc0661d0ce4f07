//! The draw pool: numbers that can still be called.

use bingo_protocol::{Draw, Letter};
use rand::Rng;
use tracing::trace;

use crate::GameError;

/// Numbers not yet drawn, tracked per letter.
///
/// For every letter, `remaining ∪ drawn` is the full range and the two
/// never overlap. The pool only ever shrinks; a new game gets a new pool.
#[derive(Debug, Clone)]
pub struct DrawPool {
    remaining: [Vec<u8>; 5],
}

impl DrawPool {
    /// A pool holding all 75 numbers.
    pub fn full() -> Self {
        Self {
            remaining: Letter::ALL.map(|l| l.range().collect()),
        }
    }

    /// `true` if any letter still has a number left.
    pub fn has_remaining(&self) -> bool {
        self.remaining.iter().any(|r| !r.is_empty())
    }

    /// Numbers left under `letter`, in no particular order.
    pub fn remaining(&self, letter: Letter) -> &[u8] {
        &self.remaining[letter.index()]
    }

    /// Total numbers left across all letters.
    pub fn remaining_count(&self) -> usize {
        self.remaining.iter().map(Vec::len).sum()
    }

    /// Whether `number` is still waiting to be drawn.
    pub fn is_remaining(&self, number: u8) -> bool {
        Letter::of(number).is_some_and(|l| self.remaining(l).contains(&number))
    }

    /// Removes and returns a random number from `letter`, or `None` if
    /// that letter is already empty.
    pub fn take_from<R: Rng + ?Sized>(&mut self, letter: Letter, rng: &mut R) -> Option<u8> {
        let pool = &mut self.remaining[letter.index()];
        if pool.is_empty() {
            return None;
        }
        let i = rng.random_range(0..pool.len());
        Some(pool.swap_remove(i))
    }

    /// Draws one number.
    ///
    /// A letter is chosen uniformly among all five. If that letter is
    /// already empty another letter is rolled, until a draw succeeds.
    /// Only five letters exist, so the expected number of re-rolls stays
    /// small even late in a game.
    ///
    /// # Errors
    /// Returns [`GameError::PoolExhausted`] if nothing is left to draw.
    pub fn draw_one<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Draw, GameError> {
        if !self.has_remaining() {
            return Err(GameError::PoolExhausted);
        }
        let mut misses = 0u32;
        loop {
            let letter = Letter::ALL[rng.random_range(0..Letter::ALL.len())];
            if let Some(number) = self.take_from(letter, rng) {
                trace!(%letter, number, misses, "number drawn");
                return Ok(Draw { letter, number });
            }
            misses += 1;
        }
    }
}

impl Default for DrawPool {
    fn default() -> Self {
        Self::full()
    }
}
