//! The rule engine: move legality and win detection.
//!
//! Rules are stateless. [`Game`](crate::Game) owns a rule value and asks
//! it two questions per move; the rule never mutates the board.

use gomoku_protocol::PlayerSlot;

use crate::{Board, Point};

/// Contiguous stones needed to win.
pub const WIN_LENGTH: usize = 5;

/// The four line families through a cell: horizontal, vertical, and the
/// two diagonals. Each is scanned in both directions.
const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// Result of evaluating the board after a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    InProgress,
    Win(PlayerSlot),
}

/// A rule set for five-in-a-row variants.
///
/// Implementations must be pure: the same board and move always yield
/// the same answer.
pub trait Rule: Send + Sync + 'static {
    /// Returns `true` if `player` may place a stone at `point`.
    fn is_valid_move(&self, board: &Board, point: Point, player: PlayerSlot) -> bool;

    /// Decides whether the stone just placed at `last_move` ends the game.
    fn evaluate(&self, board: &Board, last_move: Point) -> Evaluation;
}

/// Free-style Gomoku: any empty cell is legal, five or more in a row wins.
///
/// Renju forbidden moves (double-three, double-four, overline for black)
/// would be layered on in `is_valid_move`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRule;

impl Rule for StandardRule {
    fn is_valid_move(&self, board: &Board, point: Point, _player: PlayerSlot) -> bool {
        !board.is_occupied(point)
    }

    fn evaluate(&self, board: &Board, last_move: Point) -> Evaluation {
        let Some(player) = board.get(last_move) else {
            return Evaluation::InProgress;
        };

        for dir in DIRECTIONS {
            let run = 1
                + run_length(board, last_move, dir, 1, player)
                + run_length(board, last_move, dir, -1, player);
            if run >= WIN_LENGTH {
                return Evaluation::Win(player);
            }
        }
        Evaluation::InProgress
    }
}

/// Counts `player`'s stones walking away from `from` (exclusive), stopping
/// at the first gap. Never looks further than a win needs.
fn run_length(
    board: &Board,
    from: Point,
    dir: (i32, i32),
    sign: i32,
    player: PlayerSlot,
) -> usize {
    (1..WIN_LENGTH as i32)
        .map_while(|i| from.step(dir, sign * i))
        .take_while(|p| board.get(*p) == Some(player))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(stones: &[(i32, i32, PlayerSlot)]) -> Board {
        let mut board = Board::new();
        for &(x, y, s) in stones {
            board.place(Point::new(x, y), s);
        }
        board
    }

    #[test]
    fn test_occupied_cell_is_invalid() {
        let board = board_with(&[(0, 0, PlayerSlot::One)]);
        assert!(!StandardRule.is_valid_move(&board, Point::new(0, 0), PlayerSlot::Two));
        assert!(StandardRule.is_valid_move(&board, Point::new(1, 0), PlayerSlot::Two));
    }

    #[test]
    fn test_empty_last_move_is_in_progress() {
        let board = Board::new();
        assert_eq!(
            StandardRule.evaluate(&board, Point::new(0, 0)),
            Evaluation::InProgress
        );
    }

    #[test]
    fn test_gap_breaks_the_run() {
        use PlayerSlot::One;
        // X X _ X X X, the gap means no five.
        let board = board_with(&[(0, 0, One), (1, 0, One), (3, 0, One), (4, 0, One), (5, 0, One)]);
        assert_eq!(
            StandardRule.evaluate(&board, Point::new(3, 0)),
            Evaluation::InProgress
        );
    }

    #[test]
    fn test_middle_stone_completes_five() {
        use PlayerSlot::Two;
        let board = board_with(&[(0, 0, Two), (1, 1, Two), (2, 2, Two), (3, 3, Two), (4, 4, Two)]);
        assert_eq!(
            StandardRule.evaluate(&board, Point::new(2, 2)),
            Evaluation::Win(Two)
        );
    }

    #[test]
    fn test_opponent_stone_stops_the_run() {
        use PlayerSlot::{One, Two};
        let board = board_with(&[(0, 0, One), (0, 1, One), (0, 2, Two), (0, 3, One), (0, 4, One)]);
        assert_eq!(
            StandardRule.evaluate(&board, Point::new(0, 4)),
            Evaluation::InProgress
        );
    }

    #[test]
    fn test_overline_still_wins() {
        use PlayerSlot::One;
        let stones: Vec<_> = (0..6).map(|x| (x, 0, One)).collect();
        let board = board_with(&stones);
        assert_eq!(
            StandardRule.evaluate(&board, Point::new(5, 0)),
            Evaluation::Win(One)
        );
    }

    #[test]
    fn test_evaluate_at_plane_edge_does_not_overflow() {
        use PlayerSlot::One;
        let board = board_with(&[(i32::MAX, 0, One), (i32::MAX - 1, 0, One)]);
        assert_eq!(
            StandardRule.evaluate(&board, Point::new(i32::MAX, 0)),
            Evaluation::InProgress
        );
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        use PlayerSlot::Two;
        let stones: Vec<_> = (0..5).map(|y| (9, y, Two)).collect();
        let board = board_with(&stones);
        let first = StandardRule.evaluate(&board, Point::new(9, 4));
        let second = StandardRule.evaluate(&board, Point::new(9, 4));
        assert_eq!(first, second);
        assert_eq!(first, Evaluation::Win(Two));
    }
}
