//! Wire vocabulary for Bullpen.
//!
//! This crate defines what travels between a room and the transport layer
//! that delivers events to connected players:
//!
//! - **Identity** ([`PlayerId`], [`RoomSlug`], [`ConnectionId`]) — who and
//!   where.
//! - **Cards** ([`Card`]) — the immutable values dealt, played, and taken.
//! - **Events** ([`ClientEvent`], [`ServerPush`]) — inbound player actions
//!   and outbound room notifications, plus the view types they carry.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (events) → Room (serialized game state)
//! ```
//!
//! The protocol layer knows nothing about rooms or rules. It only names
//! things and knows how to (de)serialize them.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Card, ClientEvent, ConnectionId, GameStatus, MemberView, PlayerId,
    Recipient, RoomSlug, ServerPush, Standing, MAX_CHAT_LEN, SLOT_COUNT,
};
