//! # Gomoku
//!
//! A real-time two-player five-in-a-row server over WebSocket.
//!
//! Every room is an actor task that owns its game; a registry actor owns
//! the room table and pushes the lobby to everyone not seated. Each
//! connection runs a reader and a writer pump that talk to the actors
//! only through queues.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gomoku::prelude::*;
//!
//! # async fn start() -> Result<(), GomokuError> {
//! let server = GomokuServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .room_config(RoomConfig::default())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
pub mod logging;
mod server;

pub use error::GomokuError;
pub use server::{GomokuServer, GomokuServerBuilder};

/// Convenience re-exports for server binaries and tests.
pub mod prelude {
    pub use crate::{GomokuError, GomokuServer, GomokuServerBuilder};

    pub use gomoku_game::{Game, GameError, Point};
    pub use gomoku_protocol::{
        ClientMessage, Codec, GameSnapshot, JsonCodec, Piece, PlayerSlot, RoomId,
        RoomSummary, ServerMessage,
    };
    pub use gomoku_room::{RegistryHandle, RoomConfig, RoomError};
    pub use gomoku_transport::TransportError;
}
