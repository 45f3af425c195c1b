//! # Bullpen
//!
//! Room server for a simultaneous-move card game in the style of
//! "6 nimmt!": every player secretly picks a card, the cards are placed
//! on four rows in ascending order, and whoever lays the sixth card on a
//! row takes the row's penalty points.
//!
//! Each room runs as its own actor. The server owns the rooms and an
//! idle-room reaper; a transport feeds frames into the [`Gateway`] and
//! forwards the pushes each room sends back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bullpen::prelude::*;
//! use tokio::sync::mpsc;
//!
//! # async fn run() -> Result<(), BullpenError> {
//! let server = BullpenServer::builder().build()?;
//! let slug = server.create_room(NewRoom::hosted_by(PlayerId(1), "ada")).await?;
//!
//! let (tx, _rx) = mpsc::unbounded_channel();
//! let origin = Origin::new(slug, PlayerId(1), ConnectionId::new(1));
//! server
//!     .gateway()
//!     .receive(&origin, &tx, br#"{"type":"Join","name":"ada","secret":null}"#)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::BullpenError;
pub use handler::{Gateway, Origin};
pub use server::{BullpenServer, BullpenServerBuilder, DEFAULT_REAP_INTERVAL};

pub mod prelude {
    pub use crate::{BullpenError, BullpenServer, BullpenServerBuilder, Gateway, Origin};
    pub use bullpen_game::{ErrorKind, Game, GameError, Step, penalty_for};
    pub use bullpen_protocol::{
        Card, ClientEvent, Codec, ConnectionId, GameStatus, JsonCodec, MAX_CHAT_LEN, MemberView,
        PlayerId, RoomSlug, SLOT_COUNT, ServerPush, Standing,
    };
    pub use bullpen_room::{
        Attach, ExpiryPolicy, MemoryStore, NameGenerator, NewRoom, PushSender, RoomConfig,
        RoomError, RoomHandle, RoomInfo, RoomManager, RoomSnapshot, RoomStore, WordNames,
    };
    pub use bullpen_tick::CountdownConfig;
}
