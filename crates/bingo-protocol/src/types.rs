//! Core protocol types: the card model and the messages on the wire.
//!
//! Every type here is what gets serialized, sent to the browser, and
//! deserialized on the other side. Messages are JSON objects tagged by a
//! snake_case `"type"` field; cards are a map from letter to five cells.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ProtocolError;

/// Number of cells in each card column (and therefore each row).
pub const CARD_SIZE: usize = 5;

/// Row of the `N` column that always holds the [`Cell::Free`] square.
pub const FREE_ROW: usize = 2;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique identifier for a participant in the room.
///
/// Assigned by the server when a connection is accepted. Serialized as a
/// plain number thanks to `#[serde(transparent)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Letter
// ---------------------------------------------------------------------------

/// One of the five card columns, each bound to a fixed range of numbers.
///
/// ```text
/// B = 1..=15   I = 16..=30   N = 31..=45   G = 46..=60   O = 61..=75
/// ```
///
/// The declaration order is the column order on the card, and `Ord`
/// follows it, so a `BTreeMap<Letter, _>` iterates B, I, N, G, O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Letter {
    B,
    I,
    N,
    G,
    O,
}

impl Letter {
    /// All letters in column order.
    pub const ALL: [Letter; 5] = [Letter::B, Letter::I, Letter::N, Letter::G, Letter::O];

    /// The inclusive range of numbers that belong to this letter.
    pub const fn range(self) -> RangeInclusive<u8> {
        match self {
            Letter::B => 1..=15,
            Letter::I => 16..=30,
            Letter::N => 31..=45,
            Letter::G => 46..=60,
            Letter::O => 61..=75,
        }
    }

    /// Column index on the card (B = 0 … O = 4).
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The letter whose range contains `number`, if any.
    pub fn of(number: u8) -> Option<Letter> {
        Self::ALL.into_iter().find(|l| l.range().contains(&number))
    }

    /// Whether `number` falls in this letter's range.
    pub fn contains(self, number: u8) -> bool {
        self.range().contains(&number)
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Letter::B => "B",
            Letter::I => "I",
            Letter::N => "N",
            Letter::G => "G",
            Letter::O => "O",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A single square on a card: a number, or the free centre square.
///
/// On the wire a number cell is a plain JSON number and the free square
/// is the string `"Free"` (any casing is accepted when decoding, since
/// older clients send `"FREE"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Number(u8),
    Free,
}

impl Cell {
    /// The number in this cell, or `None` for the free square.
    pub fn number(self) -> Option<u8> {
        match self {
            Cell::Number(n) => Some(n),
            Cell::Free => None,
        }
    }

    /// Whether this is the free centre square.
    pub fn is_free(self) -> bool {
        matches!(self, Cell::Free)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Number(n) => serializer.serialize_u8(*n),
            Cell::Free => serializer.serialize_str("Free"),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CellVisitor)
    }
}

struct CellVisitor;

impl<'de> Visitor<'de> for CellVisitor {
    type Value = Cell;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number from 0 to 255 or the string \"Free\"")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Cell, E> {
        u8::try_from(v)
            .map(Cell::Number)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Cell, E> {
        u8::try_from(v)
            .map(Cell::Number)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Cell, E> {
        if v.eq_ignore_ascii_case("free") {
            Ok(Cell::Free)
        } else {
            Err(E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// A card as it appears on the wire: letter → list of cells.
///
/// This is deliberately loose. A claim from a client arrives in this
/// form and is only turned into a [`BingoCard`] after its shape has been
/// checked, so a bad card becomes a rejected claim rather than an
/// undecodable frame.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardLayout(pub BTreeMap<Letter, Vec<Cell>>);

/// A participant's 5×5 card.
///
/// Invariants upheld by every constructor:
/// - every letter has exactly [`CARD_SIZE`] cells;
/// - [`Cell::Free`] appears exactly once, at `N[FREE_ROW]`.
///
/// Whether the numbers are in range and distinct is the generator's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CardLayout", into = "CardLayout")]
pub struct BingoCard {
    columns: [[Cell; CARD_SIZE]; 5],
}

impl BingoCard {
    /// Builds a card from columns in B, I, N, G, O order.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if the free square is
    /// missing from `N[FREE_ROW]` or appears anywhere else.
    pub fn from_columns(columns: [[Cell; CARD_SIZE]; 5]) -> Result<Self, ProtocolError> {
        for letter in Letter::ALL {
            for (row, cell) in columns[letter.index()].iter().enumerate() {
                let centre = letter == Letter::N && row == FREE_ROW;
                if centre && !cell.is_free() {
                    return Err(ProtocolError::InvalidMessage(format!(
                        "cell N[{FREE_ROW}] must be Free"
                    )));
                }
                if !centre && cell.is_free() {
                    return Err(ProtocolError::InvalidMessage(format!(
                        "Free is only allowed at N[{FREE_ROW}], found at {letter}[{row}]"
                    )));
                }
            }
        }
        Ok(Self { columns })
    }

    /// The five cells under `letter`, top to bottom.
    pub fn column(&self, letter: Letter) -> &[Cell; CARD_SIZE] {
        &self.columns[letter.index()]
    }

    /// The cell at `row` under `letter`.
    pub fn cell(&self, letter: Letter, row: usize) -> Cell {
        self.columns[letter.index()][row]
    }

    /// Row `row` read across the card, B to O.
    pub fn row(&self, row: usize) -> [Cell; 5] {
        Letter::ALL.map(|l| self.columns[l.index()][row])
    }

    /// Every number on the card (the free square excluded).
    pub fn numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.columns.iter().flatten().filter_map(|c| c.number())
    }
}

impl TryFrom<CardLayout> for BingoCard {
    type Error = ProtocolError;

    fn try_from(layout: CardLayout) -> Result<Self, Self::Error> {
        let mut columns = [[Cell::Free; CARD_SIZE]; 5];
        for letter in Letter::ALL {
            let cells = layout.0.get(&letter).ok_or_else(|| {
                ProtocolError::InvalidMessage(format!("card is missing column {letter}"))
            })?;
            columns[letter.index()] = <[Cell; CARD_SIZE]>::try_from(cells.as_slice())
                .map_err(|_| {
                    ProtocolError::InvalidMessage(format!(
                        "column {letter} has {} cells, expected {CARD_SIZE}",
                        cells.len()
                    ))
                })?;
        }
        BingoCard::from_columns(columns)
    }
}

impl From<BingoCard> for CardLayout {
    fn from(card: BingoCard) -> Self {
        CardLayout(
            Letter::ALL
                .into_iter()
                .map(|l| (l, card.columns[l.index()].to_vec()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Draws
// ---------------------------------------------------------------------------

/// A number revealed during a game, with the letter it was called under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Draw {
    pub letter: Letter,
    pub number: u8,
}

impl fmt::Display for Draw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.letter, self.number)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive a server message produced by the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every participant in the room.
    All,
    /// One specific participant.
    Player(PlayerId),
    /// Everyone except the given participant.
    AllExcept(PlayerId),
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Answer to a `check_number` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberStatus {
    Generated,
    NotGenerated,
}

/// Why a win claim was turned down. Only the claimant is told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimRejection {
    /// No row or column of the card is fully drawn.
    NotAWin,
    /// The card has the wrong shape.
    MalformedCard,
    /// The card is well-formed but not the one this participant was dealt.
    CardMismatch,
    /// The game is no longer accepting claims (already won, exhausted, or not started).
    GameOver,
}

impl fmt::Display for ClaimRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotAWin => "not a win",
            Self::MalformedCard => "malformed card",
            Self::CardMismatch => "card does not match the one issued",
            Self::GameOver => "game is over",
        };
        f.write_str(s)
    }
}

/// Messages a participant sends to the server.
///
/// Internally tagged: `{"type": "check_number", "number": 7}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// "Has this number been called yet?"
    ///
    /// Any integer is accepted; numbers that can never be drawn are simply
    /// reported as not generated.
    CheckNumber { number: i64 },

    /// "Bingo!": the card the participant believes is a winner.
    /// Older clients send this with `"type": "bingo"`.
    #[serde(alias = "bingo")]
    ClaimWin { card: CardLayout },
}

/// Messages the server sends to participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The participant's own card, sent once right after joining.
    BingoCard { card: BingoCard },

    /// The most recent draw, sent on join so late joiners can show it.
    LastNumber { letter: Letter, number: u8 },

    /// Every draw so far, in order. Sent on join when the game has history.
    DrawHistory { draws: Vec<Draw> },

    /// A new number was drawn. `sequence` counts draws from 1.
    DrawAnnounced {
        letter: Letter,
        number: u8,
        sequence: usize,
    },

    /// Reply to `check_number`, echoing the number as sent.
    NumberStatus { number: i64, status: NumberStatus },

    /// Someone won. `is_winner` is true only in the copy sent to the winner.
    BingoWinner {
        winner: PlayerId,
        message: String,
        is_winner: bool,
    },

    /// The claimant's card was not accepted.
    ClaimRejected { reason: ClaimRejection },

    /// Every number has been drawn and nobody claimed a win.
    DrawsExhausted { draws: usize },

    /// Sent to a participant joining a game that has already ended.
    GameOver { winner: Option<PlayerId> },

    /// The room was reset and a fresh game is starting.
    NewGame,

    /// The server couldn't process a frame. The connection stays open.
    Error { code: u16, message: String },
}
