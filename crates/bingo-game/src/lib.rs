//! Game rules for the bingo hall.
//!
//! Everything in this crate is synchronous and free of I/O. The room
//! actor owns one [`DrawPool`] and one [`DrawHistory`] per game and
//! calls into these types while holding exclusive access to them.
//!
//! - [`generate_card`]: deal a card to a participant
//! - [`DrawPool`]: numbers still to be called, per letter
//! - [`DrawHistory`]: numbers already called, in order
//! - [`check_win`] / [`winning_line`]: does a card have a full row or column?

mod card;
mod error;
mod history;
mod pool;
mod win;

pub use card::{generate_card, generate_card_with};
pub use error::GameError;
pub use history::DrawHistory;
pub use pool::DrawPool;
pub use win::{WinningLine, check_win, winning_line};
