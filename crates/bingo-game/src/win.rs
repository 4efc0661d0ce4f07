//! Win evaluation.

use std::collections::HashSet;
use std::fmt;

use bingo_protocol::{BingoCard, CARD_SIZE, Cell, Letter};

/// The line that completed a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinningLine {
    /// Row index, read across B to O.
    Row(usize),
    /// A whole letter column.
    Column(Letter),
}

impl fmt::Display for WinningLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row(r) => write!(f, "row {r}"),
            Self::Column(l) => write!(f, "column {l}"),
        }
    }
}

/// `true` if any row or column of `card` is fully drawn.
pub fn check_win(card: &BingoCard, drawn: &HashSet<u8>) -> bool {
    winning_line(card, drawn).is_some()
}

/// The first completed line, checking rows top to bottom before columns.
///
/// A cell counts as marked if it is the free square or its number is in
/// `drawn`. The column a number sits under plays no part; whether the
/// card itself is legitimate is the caller's concern.
pub fn winning_line(card: &BingoCard, drawn: &HashSet<u8>) -> Option<WinningLine> {
    for row in 0..CARD_SIZE {
        let complete = Letter::ALL
            .iter()
            .all(|&letter| is_marked(card.cell(letter, row), drawn));
        if complete {
            return Some(WinningLine::Row(row));
        }
    }

    Letter::ALL
        .into_iter()
        .find(|&letter| {
            card.column(letter)
                .iter()
                .all(|&cell| is_marked(cell, drawn))
        })
        .map(WinningLine::Column)
}

fn is_marked(cell: Cell, drawn: &HashSet<u8>) -> bool {
    match cell {
        Cell::Free => true,
        Cell::Number(n) => drawn.contains(&n),
    }
}
