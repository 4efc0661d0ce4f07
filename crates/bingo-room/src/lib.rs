//! Room coordination for the bingo hall.
//!
//! The room is a single Tokio task (actor) that owns every piece of
//! shared game state: the draw pool, the draw history, the winner, and
//! the handle of the one running draw scheduler. Participants and the
//! scheduler talk to it only through its command channel, so a join, a
//! draw, and a win claim can never interleave.
//!
//! # Key types
//!
//! - [`spawn_room`]: start the room actor
//! - [`RoomHandle`]: send commands to the running room
//! - [`GameState`]: `Idle → Drawing → {Won, Exhausted}`
//! - [`RoomConfig`]: draw interval, capacity, card checking, seeding
//! - [`ClaimOutcome`] / [`CatchUpSnapshot`]: results handed back to callers

mod config;
mod error;
mod room;

pub use config::{GameState, RoomConfig};
pub use error::RoomError;
pub use room::{
    CatchUpSnapshot, ClaimOutcome, PlayerSender, RoomHandle, RoomInfo, spawn_room,
};
