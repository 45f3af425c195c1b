//! Error types for the room layer.

use bullpen_game::{ErrorKind, GameError};
use bullpen_protocol::{PlayerId, RoomSlug};

use crate::StoreError;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomSlug),

    /// The player has no seat in this room.
    #[error("player {0} is not in room {1}")]
    NotInRoom(PlayerId, RoomSlug),

    /// Every seat is taken and the joiner is not a known player.
    #[error("room {0} is full")]
    RoomFull(RoomSlug),

    /// Seats are closed once cards are dealt.
    #[error("room {0} has already started its game")]
    GameStarted(RoomSlug),

    /// Membership can't change this way mid-game.
    #[error("not allowed while a game is running in room {0}")]
    GameRunning(RoomSlug),

    /// No free slug was found after the configured number of attempts.
    #[error("could not find a free room name after {0} attempts")]
    NameExhausted(usize),

    /// The join secret did not match.
    #[error("wrong secret for room {0}")]
    WrongSecret(RoomSlug),

    /// A host-only action from someone else.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// Plays are being resolved; the move was not queued.
    #[error("round resolution in progress, try again")]
    Busy,

    /// The room stopped on an internal failure and waits for the host.
    #[error("room halted: {0}")]
    Halted(String),

    /// `RestartRound` when the room isn't halted.
    #[error("room is not halted")]
    NotHalted,

    /// Rejected by the rules engine.
    #[error(transparent)]
    Game(#[from] GameError),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomSlug),

    /// The store failed on a path where it is authoritative.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RoomError {
    /// Maps the error onto the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::NotInRoom(..) => ErrorKind::NotFound,
            Self::RoomFull(_)
            | Self::GameStarted(_)
            | Self::GameRunning(_)
            | Self::NameExhausted(_) => ErrorKind::Conflict,
            Self::WrongSecret(_)
            | Self::NotHost(_)
            | Self::Busy
            | Self::Halted(_)
            | Self::NotHalted => ErrorKind::IllegalMove,
            Self::Game(err) => err.kind(),
            Self::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            Self::Unavailable(_) | Self::Store(_) => ErrorKind::Internal,
        }
    }
}
