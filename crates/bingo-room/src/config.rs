//! Room configuration and game state machine.

use std::time::Duration;

use bingo_scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration for the room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Pause between two draws.
    pub draw_interval: Duration,

    /// Maximum participants registered at once.
    pub max_players: usize,

    /// Reject claims whose card differs from the one dealt to the claimant.
    pub verify_issued_card: bool,

    /// Seed for card dealing and draws. `None` seeds from the OS.
    pub seed: Option<u64>,

    /// Capacity of the room's command channel. Senders wait when full.
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            draw_interval: SchedulerConfig::DEFAULT_INTERVAL,
            max_players: 10_000,
            verify_issued_card: true,
            seed: None,
            channel_size: 64,
        }
    }
}

impl RoomConfig {
    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`spawn_room`](crate::spawn_room).
    /// The draw interval is clamped by the scheduler itself.
    pub fn validated(mut self) -> Self {
        if self.max_players == 0 {
            warn!("max_players is 0, raising to 1");
            self.max_players = 1;
        }
        if self.channel_size == 0 {
            warn!("channel_size is 0, raising to 1");
            self.channel_size = 1;
        }
        self
    }

    pub(crate) fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::with_interval(self.draw_interval)
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// The lifecycle state of the room's game.
///
/// ```text
///            first join             win claim accepted
///   Idle ───────────────→ Drawing ────────────────────→ Won
///     ↑                      │                            │
///     │                      └──── pool exhausted ──→ Exhausted
///     │                                                   │
///     └────────────── new_game (operator) ────────────────┘
/// ```
///
/// `Won` and `Exhausted` are terminal for a game; only an explicit
/// `new_game` leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Idle,
    Drawing,
    Won,
    Exhausted,
}

impl GameState {
    /// Returns `true` while numbers are being drawn and claims are accepted.
    pub fn is_drawing(&self) -> bool {
        matches!(self, Self::Drawing)
    }

    /// Returns `true` once the game has ended, with or without a winner.
    pub fn is_over(&self) -> bool {
        matches!(self, Self::Won | Self::Exhausted)
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Idle, Self::Drawing)
                | (Self::Drawing, Self::Won)
                | (Self::Drawing, Self::Exhausted)
                | (Self::Won, Self::Idle)
                | (Self::Exhausted, Self::Idle)
        )
    }
}

impl std::fmt::Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Drawing => write!(f, "Drawing"),
            Self::Won => write!(f, "Won"),
            Self::Exhausted => write!(f, "Exhausted"),
        }
    }
}
