//! Codec trait and implementations for serializing/deserializing events.
//!
//! The room never cares how a [`ServerPush`](crate::ServerPush) becomes
//! bytes. The transport layer picks a [`Codec`] and uses it for inbound
//! events and outbound pushes alike.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because a codec lives as long as the server and
/// is shared by every room task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected shape.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;

    /// Decodes an inbound [`ClientEvent`](crate::ClientEvent) and applies
    /// the protocol-level checks serde can't express.
    fn decode_event(
        &self,
        data: &[u8],
    ) -> Result<crate::ClientEvent, ProtocolError> {
        let event: crate::ClientEvent = self.decode(data)?;
        event.validate()?;
        Ok(event)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Human-readable, so pushes can be inspected in browser DevTools. Behind
/// the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use bullpen_protocol::{ClientEvent, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&ClientEvent::SubmitMove { card_id: 42 }).unwrap();
/// let decoded: ClientEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, ClientEvent::SubmitMove { card_id: 42 });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
