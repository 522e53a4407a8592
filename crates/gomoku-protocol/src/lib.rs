//! Wire protocol for the Gomoku server.
//!
//! This crate defines the language clients and the server speak:
//!
//! - **Identities** ([`RoomId`], [`PlayerSlot`]) shared by every layer.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]) and their
//!   payloads ([`RoomSummary`], [`GameSnapshot`], [`Piece`]).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become
//!   frames.
//! - **Errors** ([`ProtocolError`]).
//!
//! It knows nothing about connections, rooms, or rules.
//!
//! ```text
//! Transport (frames) → Protocol (typed messages) → Room / Registry actors
//! ```

mod codec;
mod error;
mod ids;
mod message;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use ids::{PlayerSlot, RoomId};
pub use message::{ClientMessage, GameSnapshot, Piece, RoomSummary, ServerMessage};
