//! Error types for the rules engine.

use bullpen_protocol::{GameStatus, PlayerId};

/// The broad category of a refusal, shared by every layer above the engine.
///
/// The room layer uses it to decide who hears about an error: rule
/// violations go back to the actor only, internal failures halt the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad player counts or an impossible deck request.
    InvalidConfiguration,
    /// Wrong phase, not your turn, card not owned, slot out of turn.
    IllegalMove,
    /// Room, round, or player absent.
    NotFound,
    /// Room full, name collision, game already started.
    Conflict,
    /// The engine found its own state inconsistent.
    Internal,
}

/// Errors returned by [`Game`](crate::Game) and the card catalog.
///
/// Every method validates before it mutates, so receiving one of these
/// means nothing changed.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The request can't describe a playable game.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Fewer seated players than the room requires to start.
    #[error("not enough players: {have} seated, {need} required")]
    NotEnoughPlayers { have: usize, need: usize },

    /// A move arrived before `startGame`.
    #[error("the game has not started")]
    NotStarted,

    /// The operation is not legal in the current status.
    #[error("not allowed while the game is {0}")]
    WrongPhase(GameStatus),

    /// The player has already submitted a card this round.
    #[error("player {0} already played this round")]
    AlreadyMoved(PlayerId),

    /// The card is not in the player's hand.
    #[error("card {card} is not in the hand of player {player}")]
    CardNotOwned { player: PlayerId, card: u32 },

    /// Someone other than the designated player tried to pick a slot.
    #[error("player {0} is not the one choosing a slot")]
    NotYourChoice(PlayerId),

    /// Slot index outside `0..4`.
    #[error("slot {0} does not exist")]
    SlotOutOfRange(usize),

    /// Resolution was requested while players still owe a card.
    #[error("still waiting on {0} player(s)")]
    PlaysOutstanding(usize),

    /// The player has no seat at this table.
    #[error("player {0} is not seated")]
    NotSeated(PlayerId),

    /// New seats are closed once cards are dealt.
    #[error("the game has already started")]
    AlreadyStarted,

    /// Seats can't be removed while a game is running.
    #[error("a game is in progress")]
    GameInProgress,

    /// The engine's own bookkeeping disagrees with itself.
    #[error("corrupted game state: {0}")]
    Corrupted(String),
}

impl GameError {
    /// Maps the error onto the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfiguration(_) | Self::NotEnoughPlayers { .. } => {
                ErrorKind::InvalidConfiguration
            }
            Self::NotStarted
            | Self::WrongPhase(_)
            | Self::AlreadyMoved(_)
            | Self::CardNotOwned { .. }
            | Self::NotYourChoice(_)
            | Self::SlotOutOfRange(_)
            | Self::PlaysOutstanding(_) => ErrorKind::IllegalMove,
            Self::NotSeated(_) => ErrorKind::NotFound,
            Self::AlreadyStarted | Self::GameInProgress => ErrorKind::Conflict,
            Self::Corrupted(_) => ErrorKind::Internal,
        }
    }
}
