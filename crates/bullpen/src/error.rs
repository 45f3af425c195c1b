//! Unified error type for Bullpen.

use bullpen_game::{ErrorKind, GameError};
use bullpen_protocol::ProtocolError;
use bullpen_room::{RoomError, StoreError};

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `bullpen` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum BullpenError {
    /// An inbound event that could not be decoded or validated.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Rejected by the rules engine outside of a room.
    #[error(transparent)]
    Game(#[from] GameError),

    /// A room-level error (full, not found, not host, busy).
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reading a configuration file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A configuration file did not parse.
    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: String,
        source: serde_json::Error,
    },
}

impl BullpenError {
    /// Maps the error onto the shared taxonomy.
    ///
    /// Malformed events count as illegal moves: the sender did something
    /// the room can't accept.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Protocol(_) => ErrorKind::IllegalMove,
            Self::Game(err) => err.kind(),
            Self::Room(err) => err.kind(),
            Self::Store(_) => ErrorKind::Internal,
            Self::Io { .. } | Self::Config { .. } => ErrorKind::InvalidConfiguration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bullpen_protocol::{PlayerId, RoomSlug};

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let bullpen_err: BullpenError = err.into();
        assert!(matches!(bullpen_err, BullpenError::Protocol(_)));
        assert_eq!(bullpen_err.kind(), ErrorKind::IllegalMove);
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(RoomSlug::new("calm-jade-otter"));
        let bullpen_err: BullpenError = err.into();
        assert!(matches!(bullpen_err, BullpenError::Room(_)));
        assert_eq!(bullpen_err.kind(), ErrorKind::NotFound);
        assert!(bullpen_err.to_string().contains("calm-jade-otter"));
    }

    #[test]
    fn test_from_game_error_keeps_kind() {
        let err = GameError::AlreadyMoved(PlayerId(4));
        let bullpen_err: BullpenError = err.into();
        assert_eq!(bullpen_err.kind(), ErrorKind::IllegalMove);
    }

    #[test]
    fn test_from_store_error() {
        let err = StoreError::Unavailable("down".into());
        let bullpen_err: BullpenError = err.into();
        assert!(matches!(bullpen_err, BullpenError::Store(_)));
        assert_eq!(bullpen_err.kind(), ErrorKind::Internal);
    }
}
