//! Error types for game rules.

/// Why a move was refused. The game state is untouched in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The game already has a winner.
    #[error("game is over")]
    GameOver,

    /// The mover is not the current player.
    #[error("not your turn")]
    NotYourTurn,

    /// The rule engine rejected the cell (occupied, or forbidden).
    #[error("invalid move")]
    InvalidMove,
}
