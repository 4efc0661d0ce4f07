//! Dealing cards.

use bingo_protocol::{BingoCard, CARD_SIZE, Cell, FREE_ROW, Letter};
use rand::Rng;
use rand::seq::index;

/// Deals a fresh card using the thread-local RNG.
pub fn generate_card() -> BingoCard {
    generate_card_with(&mut rand::rng())
}

/// Deals a fresh card from the given random source.
///
/// Each column gets five distinct numbers sampled uniformly from its
/// letter's range. The `N` column is sampled the same way and then its
/// centre cell is overwritten with [`Cell::Free`], so one sampled `N`
/// number is discarded.
pub fn generate_card_with<R: Rng + ?Sized>(rng: &mut R) -> BingoCard {
    let mut columns = [[Cell::Free; CARD_SIZE]; 5];

    for letter in Letter::ALL {
        let range = letter.range();
        let start = *range.start();
        let picks = index::sample(rng, range.len(), CARD_SIZE);
        for (row, offset) in picks.into_iter().enumerate() {
            // offset < 15, so the sum stays inside the letter's range.
            columns[letter.index()][row] = Cell::Number(start + offset as u8);
        }
    }
    columns[Letter::N.index()][FREE_ROW] = Cell::Free;

    BingoCard::from_columns(columns).expect("generated card has Free only at the centre")
}
