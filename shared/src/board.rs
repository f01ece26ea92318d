//! Normalized board representation.
//!
//! The server pushes the board as a grid of loosely typed JSON values
//! (`null`/`0`/`false`/`""` for an open cell, `1` for a blocked cell, a player
//! id string for an occupied cell). Everything is converted to [`BoardCell`]
//! at ingest; any other raw value is rejected.

use crate::{PlayerId, Position, ProtocolError};
use serde_json::Value;
use std::collections::HashSet;

/// Grid exactly as it arrives on the wire, indexed `[y][x]`.
pub type RawGrid = Vec<Vec<Value>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCell {
    Empty,
    Blocked,
    OccupiedBy(PlayerId),
}

impl BoardCell {
    fn from_raw(value: &Value, x: usize, y: usize) -> Result<Self, ProtocolError> {
        let cell = match value {
            Value::Null | Value::Bool(false) => Some(BoardCell::Empty),
            Value::String(s) if s.is_empty() => Some(BoardCell::Empty),
            Value::String(s) => Some(BoardCell::OccupiedBy(PlayerId::new(s.as_str()))),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f == 0.0 => Some(BoardCell::Empty),
                Some(f) if f == 1.0 => Some(BoardCell::Blocked),
                _ => None,
            },
            Value::Bool(true) | Value::Array(_) | Value::Object(_) => None,
        };
        cell.ok_or_else(|| ProtocolError::InvalidCell {
            x,
            y,
            value: value.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BoardCell::Empty)
    }

    pub fn occupant(&self) -> Option<&PlayerId> {
        match self {
            BoardCell::OccupiedBy(id) => Some(id),
            _ => None,
        }
    }
}

/// Rectangular grid of cells, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    size_x: usize,
    size_y: usize,
    cells: Vec<BoardCell>,
}

impl Board {
    pub fn empty(size_x: usize, size_y: usize) -> Self {
        Self {
            size_x,
            size_y,
            cells: vec![BoardCell::Empty; size_x * size_y],
        }
    }

    /// Normalizes a raw wire grid. Rejects ragged rows, unknown cell values,
    /// and a player id that occupies more than one cell.
    pub fn from_raw(grid: &[Vec<Value>]) -> Result<Self, ProtocolError> {
        let size_y = grid.len();
        let size_x = grid.first().map_or(0, Vec::len);
        let mut cells = Vec::with_capacity(size_x * size_y);
        let mut seen = HashSet::new();

        for (y, row) in grid.iter().enumerate() {
            if row.len() != size_x {
                return Err(ProtocolError::RaggedBoard {
                    row: y,
                    len: row.len(),
                    expected: size_x,
                });
            }
            for (x, value) in row.iter().enumerate() {
                let cell = BoardCell::from_raw(value, x, y)?;
                if let Some(id) = cell.occupant() {
                    if !seen.insert(id.clone()) {
                        return Err(ProtocolError::DuplicateOccupant(id.clone()));
                    }
                }
                cells.push(cell);
            }
        }

        Ok(Self {
            size_x,
            size_y,
            cells,
        })
    }

    /// Builder used to lay out fixtures. Keeps the one-cell-per-player rule.
    pub fn with_cell(mut self, pos: Position, cell: BoardCell) -> Result<Self, ProtocolError> {
        let index = self.index(pos).ok_or(ProtocolError::OutOfBounds(pos))?;
        if let Some(id) = cell.occupant() {
            if let Some(existing) = self.locate(id) {
                if existing != pos {
                    return Err(ProtocolError::DuplicateOccupant(id.clone()));
                }
            }
        }
        self.cells[index] = cell;
        Ok(self)
    }

    pub fn size_x(&self) -> usize {
        self.size_x
    }

    pub fn size_y(&self) -> usize {
        self.size_y
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.index(pos).is_some()
    }

    pub fn get(&self, pos: Position) -> Option<&BoardCell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    /// Linear scan for the cell holding `player`.
    pub fn locate(&self, player: &PlayerId) -> Option<Position> {
        self.cells
            .iter()
            .position(|cell| cell.occupant() == Some(player))
            .map(|i| self.position_of(i))
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(i, _)| self.position_of(i))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[BoardCell]> {
        // chunks() panics on a zero chunk size
        self.cells.chunks(self.size_x.max(1))
    }

    fn index(&self, pos: Position) -> Option<usize> {
        let x = usize::try_from(pos.x).ok()?;
        let y = usize::try_from(pos.y).ok()?;
        (x < self.size_x && y < self.size_y).then(|| y * self.size_x + x)
    }

    fn position_of(&self, index: usize) -> Position {
        Position::new((index % self.size_x) as i32, (index / self.size_x) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawGrid {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalizes_loose_cells() {
        let grid = raw(json!([[null, 0, false, ""], [1, "p1", 0, null]]));
        let board = Board::from_raw(&grid).unwrap();

        assert_eq!(board.size_x(), 4);
        assert_eq!(board.size_y(), 2);
        assert_eq!(board.get(Position::new(0, 0)), Some(&BoardCell::Empty));
        assert_eq!(board.get(Position::new(3, 0)), Some(&BoardCell::Empty));
        assert_eq!(board.get(Position::new(0, 1)), Some(&BoardCell::Blocked));
        assert_eq!(
            board.get(Position::new(1, 1)),
            Some(&BoardCell::OccupiedBy(PlayerId::from("p1")))
        );
    }

    #[test]
    fn test_rejects_unknown_cell_values() {
        for bad in [json!(2), json!(true), json!([1]), json!({"id": "p1"}), json!(0.5)] {
            let grid = raw(json!([[null, bad]]));
            match Board::from_raw(&grid) {
                Err(ProtocolError::InvalidCell { x, y, .. }) => {
                    assert_eq!((x, y), (1, 0));
                }
                other => panic!("expected InvalidCell, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_rejects_ragged_grid() {
        let grid = raw(json!([[0, 0, 0], [0, 0]]));
        assert!(matches!(
            Board::from_raw(&grid),
            Err(ProtocolError::RaggedBoard { row: 1, len: 2, expected: 3 })
        ));
    }

    #[test]
    fn test_rejects_duplicate_occupant() {
        let grid = raw(json!([["p1", 0], [0, "p1"]]));
        assert!(matches!(
            Board::from_raw(&grid),
            Err(ProtocolError::DuplicateOccupant(_))
        ));
    }

    #[test]
    fn test_locate_player() {
        let grid = raw(json!([[0, 0, 0], [0, 0, "p2"], ["p1", 1, 0]]));
        let board = Board::from_raw(&grid).unwrap();

        assert_eq!(board.locate(&"p1".into()), Some(Position::new(0, 2)));
        assert_eq!(board.locate(&"p2".into()), Some(Position::new(2, 1)));
        assert_eq!(board.locate(&"p3".into()), None);
    }

    #[test]
    fn test_bounds() {
        let board = Board::empty(9, 9);
        assert!(board.contains(Position::new(8, 8)));
        assert!(!board.contains(Position::new(9, 0)));
        assert!(!board.contains(Position::new(-1, 0)));
        assert_eq!(board.empty_cells().count(), 81);
    }

    #[test]
    fn test_with_cell_keeps_single_occupancy() {
        let board = Board::empty(3, 3)
            .with_cell(Position::new(0, 0), BoardCell::OccupiedBy("p1".into()))
            .unwrap();
        assert!(matches!(
            board
                .clone()
                .with_cell(Position::new(1, 1), BoardCell::OccupiedBy("p1".into())),
            Err(ProtocolError::DuplicateOccupant(_))
        ));
        assert!(matches!(
            board.with_cell(Position::new(3, 0), BoardCell::Blocked),
            Err(ProtocolError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_empty_grid() {
        let board = Board::from_raw(&[]).unwrap();
        assert_eq!(board.size_x(), 0);
        assert_eq!(board.empty_cells().count(), 0);
        assert_eq!(board.rows().count(), 0);
    }
}
