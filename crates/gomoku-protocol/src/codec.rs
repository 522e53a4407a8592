//! Codec trait and implementations for turning messages into frames.
//!
//! The server never touches bytes directly: the connection pumps hand
//! typed [`ClientMessage`](crate::ClientMessage) and
//! [`ServerMessage`](crate::ServerMessage) values to a [`Codec`] and move
//! the resulting frames over the transport.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to frames and decodes frames back.
///
/// `Send + Sync + 'static` because one codec is shared by every
/// connection task for the life of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the frame is malformed or does
    /// not match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that speaks JSON (via `serde_json`).
///
/// Browser clients read the frames directly, so this is the default.
///
/// ```rust
/// use gomoku_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let msg: ClientMessage = codec
///     .decode(br#"{"type":"MAKE_MOVE","payload":{"x":7,"y":7}}"#)
///     .unwrap();
/// assert_eq!(msg, ClientMessage::MakeMove { x: 7, y: 7 });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
