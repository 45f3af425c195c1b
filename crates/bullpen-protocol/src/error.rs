//! Error types for the protocol layer.
//!
//! Each crate in Bullpen defines its own error enum. A `ProtocolError`
//! always means the problem is in (de)serialization, never in the rules
//! or in room management.

/// Errors that can occur while encoding or decoding events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust value).
    ///
    /// Common causes: malformed JSON, an unknown event `type` tag, or a
    /// missing field such as `card_id`.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The bytes decoded but the event makes no sense at the protocol level,
    /// e.g. an empty display name on `Join`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
