//! Sparse board storage.

use std::collections::HashMap;

use gomoku_protocol::PlayerSlot;

/// A cell coordinate. Any `i32` pair is a legal address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The point `steps` cells away along `(dx, dy)`, or `None` if that
    /// would leave the `i32` plane.
    pub fn step(self, (dx, dy): (i32, i32), steps: i32) -> Option<Self> {
        let x = self.x.checked_add(dx.checked_mul(steps)?)?;
        let y = self.y.checked_add(dy.checked_mul(steps)?)?;
        Some(Self { x, y })
    }
}

/// Occupied cells only; a missing key is an empty cell.
#[derive(Debug, Clone, Default)]
pub struct Board {
    cells: HashMap<Point, PlayerSlot>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Who owns `point`, if anyone.
    pub fn get(&self, point: Point) -> Option<PlayerSlot> {
        self.cells.get(&point).copied()
    }

    pub fn is_occupied(&self, point: Point) -> bool {
        self.cells.contains_key(&point)
    }

    pub(crate) fn place(&mut self, point: Point, player: PlayerSlot) {
        self.cells.insert(point, player);
    }

    pub(crate) fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates over every stone in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (Point, PlayerSlot)> + '_ {
        self.cells.iter().map(|(p, s)| (*p, *s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_moves_along_direction() {
        let p = Point::new(3, 4);
        assert_eq!(p.step((1, -1), 2), Some(Point::new(5, 2)));
        assert_eq!(p.step((1, 0), -3), Some(Point::new(0, 4)));
    }

    #[test]
    fn test_step_off_the_plane_is_none() {
        let edge = Point::new(i32::MAX, 0);
        assert_eq!(edge.step((1, 0), 1), None);
        assert_eq!(Point::new(i32::MIN, 0).step((1, 0), -1), None);
    }

    #[test]
    fn test_board_place_and_get() {
        let mut board = Board::new();
        assert!(board.is_empty());

        board.place(Point::new(-100, 250), PlayerSlot::Two);

        assert_eq!(board.get(Point::new(-100, 250)), Some(PlayerSlot::Two));
        assert_eq!(board.get(Point::new(0, 0)), None);
        assert_eq!(board.len(), 1);
    }
}
