//! Five-in-a-row game logic.
//!
//! Pure, synchronous, and owned by exactly one room actor at a time:
//!
//! - [`Board`] / [`Point`]: sparse, unbounded board keyed by coordinate
//! - [`Rule`] / [`StandardRule`]: move legality and win detection
//! - [`Game`]: turn order, game-over handling, viewport growth, snapshots

mod board;
mod error;
mod game;
mod rule;

pub use board::{Board, Point};
pub use error::GameError;
pub use game::{Game, INITIAL_VISIBLE_SIZE, MoveOutcome};
pub use rule::{Evaluation, Rule, StandardRule, WIN_LENGTH};
