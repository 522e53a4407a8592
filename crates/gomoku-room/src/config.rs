//! Room configuration and lifecycle state machine.

use std::time::Duration;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room the registry spawns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// How long a finished room lingers so the final snapshot reaches both
    /// players before teardown.
    pub close_grace: Duration,

    /// Capacity of each room actor's command queue.
    pub command_buffer: usize,

    /// Capacity of each connection's outbound queue. A peer that lets it
    /// fill up is disconnected.
    pub outbound_capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            close_grace: Duration::from_secs(1),
            command_buffer: 64,
            outbound_capacity: 256,
        }
    }
}

impl RoomConfig {
    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    pub fn with_command_buffer(mut self, size: usize) -> Self {
        self.command_buffer = size.max(1);
        self
    }

    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// Transitions only move forward, though states may be skipped:
///
/// ```text
/// WaitingForPlayers → InProgress → Finished → Closed
/// ```
///
/// - **WaitingForPlayers**: fewer than two seats taken. Listed in the lobby.
/// - **InProgress**: both seats taken, moves are being played.
/// - **Finished**: someone won or forfeited. The room waits out its grace
///   delay.
/// - **Closed**: the actor has released its members and exited. A lone
///   player leaving goes straight here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoomState {
    WaitingForPlayers,
    InProgress,
    Finished,
    Closed,
}

impl RoomState {
    /// Returns `true` if the room still has a free seat to offer.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::WaitingForPlayers)
    }

    /// Returns `true` once the game can no longer be played.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Closed)
    }

    /// Returns `true` if moving to `target` goes forward.
    pub fn can_transition_to(self, target: Self) -> bool {
        target > self
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitingForPlayers => write!(f, "WaitingForPlayers"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Finished => write!(f, "Finished"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}
