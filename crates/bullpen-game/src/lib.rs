//! Rules engine for Bullpen.
//!
//! Everything in this crate is synchronous and owns no I/O: the room layer
//! decides *when* to call it, this crate decides *what happens*.
//!
//! # Key types
//!
//! - [`generate_deck`] / [`shuffle`] — the card catalog
//! - [`Board`] — four slots and the placement rule
//! - [`Game`] — the status state machine, dealing, move validation,
//!   resolution, penalties, and final ranking
//! - [`GameError`] / [`ErrorKind`] — every way a rule can refuse

mod board;
mod cards;
mod engine;
mod error;

pub use board::{Board, Slot, SLOT_CAPACITY};
pub use cards::{deck_size, generate_deck, penalty_for, shuffle, HAND_SIZE, ROUNDS};
pub use engine::{Game, Placement, Play, Player, RoundEnd, Seating, Step};
pub use error::{ErrorKind, GameError};
