//! Rooms, the registry, and per-connection outbound queues.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns one
//! [`Game`](gomoku_game::Game). A single registry task owns the room table
//! and the lobby. Nothing here touches sockets: connections are represented
//! by their [`Outbox`].
//!
//! # Key types
//!
//! - [`Registry`] / [`RegistryHandle`]: create and join rooms, route moves
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Outbox`]: non-blocking, bounded queue towards one connection
//! - [`RoomState`]: lifecycle state machine
//! - [`RoomConfig`]: grace delay and queue sizes

mod config;
mod error;
mod outbox;
mod registry;
mod room;

pub use config::{RoomConfig, RoomState};
pub use error::{OutboxError, RoomError};
pub use outbox::{Outbox, OutboxReceiver, outbox};
pub use registry::{MAX_ROOM_NAME_LEN, Registry, RegistryHandle};
pub use room::{MAX_PLAYERS, RoomHandle};
