//! Core protocol types: identities, cards, and the events that travel
//! between a room and its players.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::ProtocolError;

/// Number of slots on every board.
pub const SLOT_COUNT: usize = 4;

/// Longest display name accepted on `Join`.
const MAX_NAME_LEN: usize = 32;

/// Longest chat line accepted on `Chat`.
pub const MAX_CHAT_LEN: usize = 500;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable identifier for a player, assigned by the external identity
/// source and carried unchanged across reconnects.
///
/// `#[serde(transparent)]` keeps the JSON form a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A room's human-readable identifier, e.g. `"brave-amber-otter"`.
///
/// Uniqueness is enforced at creation time against live rooms and the
/// room store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomSlug(pub String);

impl RoomSlug {
    /// Creates a slug from anything string-like.
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Returns the slug as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store key holding the room mapping: `room:<slug>`.
    pub fn store_key(&self) -> String {
        format!("room:{}", self.0)
    }

    /// Store key holding the pending plays of one round:
    /// `room:<slug>:<round>`.
    pub fn round_key(&self, round: u32) -> String {
        format!("room:{}:{}", self.0, round)
    }
}

impl fmt::Display for RoomSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of one transport connection.
///
/// A player keeps their [`PlayerId`] across reconnects but gets a new
/// `ConnectionId` every time; the room uses it to ignore disconnect
/// notices from connections it has already replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// One card of a generated deck. Created once, never mutated.
///
/// `rank` drives ordering and placement, `penalty` is the number of bull
/// points charged when the card is taken, `image` is decorative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub id: u32,
    pub rank: u32,
    pub penalty: u32,
    pub image: String,
}

// ---------------------------------------------------------------------------
// Game status
// ---------------------------------------------------------------------------

/// Phase of a room's game. Only transitions of this value change which
/// moves are legal.
///
/// ```text
/// UNSTARTED → CHOOSE_CARD ⇄ CHOOSE_SLOT
///                  ↓
///                ENDED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    #[default]
    Unstarted,
    ChooseCard,
    ChooseSlot,
    Ended,
}

impl GameStatus {
    /// `true` between `startGame` and the end of round 10.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::ChooseCard | Self::ChooseSlot)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unstarted => write!(f, "UNSTARTED"),
            Self::ChooseCard => write!(f, "CHOOSE_CARD"),
            Self::ChooseSlot => write!(f, "CHOOSE_SLOT"),
            Self::Ended => write!(f, "ENDED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive a [`ServerPush`]. Rooms address every push they
/// emit with one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every member of the room with a live connection.
    All,
    /// One member only (their hand, a rejection).
    Player(PlayerId),
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A member as everyone in the room sees them. Never includes the hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberView {
    pub player_id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub must_move: bool,
    pub penalty: u32,
    pub connected: bool,
}

/// One line of the final ranking. `position` starts at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub position: usize,
    pub player_id: PlayerId,
    pub name: String,
    pub penalty: u32,
}

// ---------------------------------------------------------------------------
// ClientEvent — what a player can ask of a room
// ---------------------------------------------------------------------------

/// Inbound events. The transport tags each one with a room slug and the
/// sender's identity before handing it to the room layer.
///
/// Internally tagged: `{ "type": "SubmitMove", "card_id": 42 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Join the room, or attach a new connection to an existing seat.
    Join {
        name: String,
        secret: Option<String>,
    },

    /// Leave the room (before the game) or step away (during it).
    Leave,

    /// Host only: deal and begin round 1.
    StartGame,

    /// Play a card from the sender's hand this round.
    SubmitMove { card_id: u32 },

    /// Designated player only: take the slot at `index` (0-based).
    ChooseSlot { index: usize },

    /// Host only: recover a halted round.
    RestartRound,

    /// Say something to everyone in the room.
    Chat { text: String },
}

impl ClientEvent {
    /// Protocol-level validation that serde can't express.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if let Self::Chat { text } = self {
            if text.trim().is_empty() {
                return Err(ProtocolError::InvalidMessage(
                    "chat message must not be empty".into(),
                ));
            }
            if text.chars().count() > MAX_CHAT_LEN {
                return Err(ProtocolError::InvalidMessage(format!(
                    "chat message longer than {MAX_CHAT_LEN} characters"
                )));
            }
        }
        if let Self::Join { name, .. } = self {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(ProtocolError::InvalidMessage(
                    "name must not be empty".into(),
                ));
            }
            if trimmed.chars().count() > MAX_NAME_LEN {
                return Err(ProtocolError::InvalidMessage(format!(
                    "name longer than {MAX_NAME_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ServerPush — what a room tells its players
// ---------------------------------------------------------------------------

/// Outbound notifications, addressed by a [`Recipient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerPush {
    /// Member list with host flag, move flags and penalty totals.
    Members { members: Vec<MemberView> },

    /// The four slots, each bottom card first.
    Board { slots: [Vec<Card>; SLOT_COUNT] },

    /// The recipient's own hand.
    Hand { cards: Vec<Card> },

    /// Who the room is waiting on. `choosing_slot` is set during the
    /// slot-choice pause, when exactly one player is listed.
    WhoMustMove {
        players: Vec<PlayerId>,
        choosing_slot: bool,
    },

    /// Cards were dealt; round 1 begins.
    GameStarted { round: u32 },

    /// A new round opened for card submission.
    RoundStarted { round: u32 },

    /// One play was resolved into a slot. `penalty` is what the player was
    /// charged for it (0 when the card was simply appended).
    Placed {
        player_id: PlayerId,
        card: Card,
        slot: usize,
        penalty: u32,
    },

    /// Seconds left on the advisory countdown.
    Countdown { remaining: u32 },

    /// Final ranking, ascending by penalty.
    Winners { standings: Vec<Standing> },

    /// The recipient's last event was refused.
    Rejected { reason: String },

    /// Resolution stopped on an internal failure; the host must restart
    /// the round.
    Halted { reason: String },

    /// A chat line and who said it.
    Chat { player_id: PlayerId, text: String },

    /// The room was closed.
    Closed,
}

// =========================================================================
// Tests
// =========================================================================
