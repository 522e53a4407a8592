//! The per-room game state machine.
//!
//! ```text
//!            apply_move (no win)
//!              ┌──────────┐
//!              ▼          │
//!   InProgress ───────────┘ ──apply_move (win) / forfeit──→ Over
//!       ▲                                                    │
//!       └──────────────────────── reset ─────────────────────┘
//! ```

use std::collections::BTreeSet;

use gomoku_protocol::{GameSnapshot, Piece, PlayerSlot};

use crate::{Board, Evaluation, GameError, Point, Rule, StandardRule};

/// Side length of the viewport hint when a game starts.
pub const INITIAL_VISIBLE_SIZE: u32 = 15;

/// What a successful move did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The turn passed to the other player.
    Continue,
    /// The mover completed a line and the game is over.
    Won(PlayerSlot),
}

/// One game of five-in-a-row.
///
/// Invariants:
/// - `piece_count == board.len()`
/// - `visible_size` is odd and only grows until [`reset`](Self::reset)
/// - once over, every move is refused with [`GameError::GameOver`]
#[derive(Debug, Clone)]
pub struct Game<R: Rule = StandardRule> {
    board: Board,
    rule: R,
    visible_size: u32,
    piece_count: usize,
    players: BTreeSet<PlayerSlot>,
    current_player: PlayerSlot,
    over: bool,
    winner: Option<PlayerSlot>,
}

impl Game<StandardRule> {
    /// A fresh game under free-style rules.
    pub fn new() -> Self {
        Self::with_rule(StandardRule)
    }
}

impl Default for Game<StandardRule> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rule> Game<R> {
    /// A fresh game under a custom rule set.
    pub fn with_rule(rule: R) -> Self {
        Self {
            board: Board::new(),
            rule,
            visible_size: INITIAL_VISIBLE_SIZE,
            piece_count: 0,
            players: BTreeSet::new(),
            current_player: PlayerSlot::One,
            over: false,
            winner: None,
        }
    }

    pub fn add_player(&mut self, slot: PlayerSlot) {
        self.players.insert(slot);
    }

    pub fn remove_player(&mut self, slot: PlayerSlot) {
        self.players.remove(&slot);
    }

    /// Seats currently taken, in slot order.
    pub fn players(&self) -> impl Iterator<Item = PlayerSlot> + '_ {
        self.players.iter().copied()
    }

    /// Places a stone for `player`.
    ///
    /// # Errors
    /// Checked in order: [`GameError::GameOver`], [`GameError::NotYourTurn`],
    /// [`GameError::InvalidMove`]. A refused move changes nothing.
    pub fn apply_move(
        &mut self,
        player: PlayerSlot,
        point: Point,
    ) -> Result<MoveOutcome, GameError> {
        if self.over {
            return Err(GameError::GameOver);
        }
        if player != self.current_player {
            return Err(GameError::NotYourTurn);
        }
        if !self.rule.is_valid_move(&self.board, point, player) {
            return Err(GameError::InvalidMove);
        }

        self.board.place(point, player);
        self.piece_count += 1;

        match self.rule.evaluate(&self.board, point) {
            Evaluation::Win(winner) => {
                self.over = true;
                self.winner = Some(winner);
                Ok(MoveOutcome::Won(winner))
            }
            Evaluation::InProgress => {
                self.current_player = self.current_player.opponent();
                self.expand_if_crowded();
                Ok(MoveOutcome::Continue)
            }
        }
    }

    /// Ends the game in favour of `loser`'s opponent. No-op once over.
    pub fn forfeit(&mut self, loser: PlayerSlot) {
        if self.over {
            return;
        }
        self.over = true;
        self.winner = Some(loser.opponent());
    }

    /// Clears the board and result but keeps the seated players.
    pub fn reset(&mut self) {
        self.board.clear();
        self.visible_size = INITIAL_VISIBLE_SIZE;
        self.piece_count = 0;
        self.current_player = PlayerSlot::One;
        self.over = false;
        self.winner = None;
    }

    /// Grows the viewport by half once 80% of it is covered, keeping the
    /// side length odd so the window has a centre cell.
    fn expand_if_crowded(&mut self) {
        let area = u64::from(self.visible_size) * u64::from(self.visible_size);
        if self.piece_count as u64 * 5 < area * 4 {
            return;
        }
        let mut grown = self.visible_size * 3 / 2;
        if grown % 2 == 0 {
            grown += 1;
        }
        tracing::debug!(
            from = self.visible_size,
            to = grown,
            pieces = self.piece_count,
            "expanding visible window"
        );
        self.visible_size = grown;
    }

    /// Renders the game for one recipient.
    ///
    /// Pieces are ordered by row then column so identical games always
    /// produce identical snapshots.
    pub fn snapshot(&self, room_name: &str, recipient: PlayerSlot) -> GameSnapshot {
        let mut pieces: Vec<Piece> = self
            .board
            .iter()
            .map(|(p, player)| Piece {
                x: p.x,
                y: p.y,
                player,
            })
            .collect();
        pieces.sort_by_key(|p| (p.y, p.x));

        GameSnapshot {
            room_name: room_name.to_owned(),
            visible_size: self.visible_size,
            pieces,
            current_player: self.current_player,
            is_game_over: self.over,
            winner: self.winner,
            your_player_id: recipient,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn visible_size(&self) -> u32 {
        self.visible_size
    }

    pub fn piece_count(&self) -> usize {
        self.piece_count
    }

    pub fn current_player(&self) -> PlayerSlot {
        self.current_player
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn winner(&self) -> Option<PlayerSlot> {
        self.winner
    }
}
