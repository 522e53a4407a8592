//! Error types for the room layer.
//!
//! The `Display` text of [`RoomError`] is what the acting connection sees
//! in its `ERROR` event, so it is written for players.

use gomoku_game::GameError;

/// Errors that can occur during room and registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No room with the requested id exists.
    #[error("Room not found.")]
    NotFound,

    /// Both seats are taken.
    #[error("Room is full.")]
    RoomFull,

    /// The connection already sits in a room.
    #[error("You are already in a room.")]
    AlreadyInRoom,

    /// A move arrived from a connection that is not seated anywhere.
    #[error("You are not in a room.")]
    NotInRoom,

    /// The room has finished or is being torn down.
    #[error("Room is closed.")]
    Closed,

    /// The requested room name is unusable.
    #[error("{0}")]
    InvalidName(String),

    /// A joinable room already uses this name (case-insensitively).
    #[error("A room with that name already exists. Please choose another name.")]
    NameTaken(String),

    /// The game refused the move.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The registry task is gone.
    #[error("Server is unavailable.")]
    Unavailable,
}

/// Why a message could not be queued for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OutboxError {
    /// The peer is not draining its queue. The outbox has been closed.
    #[error("outbound queue is full")]
    Full,

    /// The outbox was already closed or its receiver is gone.
    #[error("outbound queue is closed")]
    Closed,
}
