//! Identity types shared by every layer: rooms and player seats.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Opaque, unguessable identity of a room.
///
/// Serialized as a plain JSON string (`#[serde(transparent)]`), which is
/// what clients echo back in `JOIN_ROOM`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Generates a fresh id: 128 random bits as 32 lowercase hex chars.
    pub fn generate() -> Self {
        let bits: u128 = rand::rng().random();
        Self(format!("{bits:032x}"))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A player's seat within a room.
///
/// On the wire a seat is the bare integer `1` or `2`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum PlayerSlot {
    One,
    Two,
}

impl PlayerSlot {
    /// The seat that moves against this one.
    pub fn opponent(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

impl From<PlayerSlot> for u8 {
    fn from(slot: PlayerSlot) -> Self {
        match slot {
            PlayerSlot::One => 1,
            PlayerSlot::Two => 2,
        }
    }
}

impl TryFrom<u8> for PlayerSlot {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(format!("player slot must be 1 or 2, got {other}")),
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", u8::from(*self))
    }
}
