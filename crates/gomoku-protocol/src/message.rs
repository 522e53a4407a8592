//! Messages that travel on the wire.
//!
//! Every frame is an envelope `{ "type": ..., "payload": ... }`. Serde's
//! adjacent tagging (`tag = "type", content = "payload"`) produces exactly
//! that shape from a plain Rust enum, and `SCREAMING_SNAKE_CASE` turns
//! `CreateRoom` into `"CREATE_ROOM"`.

use serde::{Deserialize, Serialize};

use crate::{PlayerSlot, RoomId};

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Everything a client may send.
///
/// Frames that fail to decode into this type (unknown `type`, missing or
/// mistyped payload fields) are dropped by the reader without a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Open a new room and take its first seat.
    CreateRoom { name: String },

    /// Take a seat in an existing room.
    JoinRoom {
        #[serde(alias = "roomId")]
        id: RoomId,
    },

    /// Place a stone on the board.
    MakeMove { x: i32, y: i32 },
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// One joinable room as shown in the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub player_count: usize,
}

/// A stone on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub x: i32,
    pub y: i32,
    pub player: PlayerSlot,
}

/// A per-recipient rendering of a game.
///
/// Two players in the same room receive identical snapshots except for
/// `your_player_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub room_name: String,
    /// Side length of the suggested viewport; always odd.
    pub visible_size: u32,
    pub pieces: Vec<Piece>,
    pub current_player: PlayerSlot,
    pub is_game_over: bool,
    /// `null` until someone wins.
    pub winner: Option<PlayerSlot>,
    pub your_player_id: PlayerSlot,
}

/// Everything the server may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// The joinable rooms, pushed to every connection in the lobby.
    RoomListUpdate { rooms: Vec<RoomSummary> },

    /// The state of the recipient's game.
    GameStateUpdate(GameSnapshot),

    /// Something the recipient asked for was refused.
    Error { message: String },
}

impl ServerMessage {
    /// Shorthand for an `ERROR` built from anything displayable.
    pub fn error(message: impl ToString) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }
}
