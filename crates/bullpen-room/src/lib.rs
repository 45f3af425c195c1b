//! Room lifecycle and turn scheduling for Bullpen.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! [`Game`](bullpen_game::Game), its roster, and its two timers. All state
//! changes for a room go through that task, one at a time.
//!
//! # Key types
//!
//! - [`RoomManager`] — creates/closes rooms, routes requests, reaps idle rooms
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomConfig`] — player limits, pacing, countdown, expiry policy
//! - [`RoomStore`] / [`MemoryStore`] — where snapshots are persisted
//! - [`NameGenerator`] / [`WordNames`] — room slug candidates
//! - [`Roster`] — membership, host role, and live connections

mod config;
mod error;
mod manager;
mod names;
mod presence;
mod room;
mod store;

pub use config::{ExpiryPolicy, MAX_TABLE_SIZE, RoomConfig};
pub use error::RoomError;
pub use manager::{NewRoom, RoomManager};
pub use names::{NameGenerator, WordNames};
pub use presence::{Attach, Member, Presence, PushSender, Roster};
pub use room::{JoinRequest, RoomHandle, RoomInfo, RoomSnapshot};
pub use store::{Fields, MemoryStore, RoomStore, StoreError};
