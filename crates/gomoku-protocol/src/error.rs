//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding frames.
///
/// A `Decode` error on an inbound frame is a validation failure: the
/// reader logs it and drops the frame without replying.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, unknown message type,
    /// or missing/mistyped payload fields.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
