//! Unified error type for the server.

use gomoku_protocol::ProtocolError;
use gomoku_room::RoomError;
use gomoku_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GomokuError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room or registry refused or could not be reached.
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use gomoku_protocol::{ClientMessage, Codec, JsonCodec};

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let gomoku_err: GomokuError = err.into();
        assert!(matches!(gomoku_err, GomokuError::Transport(_)));
        assert!(gomoku_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = JsonCodec.decode::<ClientMessage>(b"not json").unwrap_err();
        let gomoku_err: GomokuError = err.into();
        assert!(matches!(gomoku_err, GomokuError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let gomoku_err: GomokuError = RoomError::NotFound.into();
        assert!(matches!(gomoku_err, GomokuError::Room(_)));
        assert_eq!(gomoku_err.to_string(), "Room not found.");
    }
}
