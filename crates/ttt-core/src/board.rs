//! The 3x3 board value type.
//!
//! A `Board` is a plain fixed-size value: placement is bounds-checked and
//! write-once per cell, so no handler can produce a ragged or aliased grid.
//!
//! Wire encoding is a 9-character digit string, row-major:
//! `0` = empty, `1` = cross (slot 1), `2` = nought (slot 2).

use crate::error::PlaceError;
use crate::marker::Marker;

/// Side length of the board.
pub const BOARD_SIZE: usize = 3;

/// One cell of the board.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Taken(Marker),
}

/// Fixed 3x3 game board.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// Create an empty board.
    pub fn new() -> Self {
        Board::default()
    }

    /// Read the cell at `(row, col)`, or `None` if out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row)?.get(col).copied()
    }

    /// Place `marker` at `(row, col)`.
    ///
    /// A cell is written at most once per game: placing on an occupied
    /// cell is rejected, the board is left untouched.
    pub fn place(&mut self, row: usize, col: usize, marker: Marker) -> Result<(), PlaceError> {
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return Err(PlaceError::OutOfRange { row, col });
        }
        if self.cells[row][col] != Cell::Empty {
            return Err(PlaceError::Occupied { row, col });
        }
        self.cells[row][col] = Cell::Taken(marker);
        Ok(())
    }

    /// Whether `marker` owns a full row, a full column, or either diagonal.
    pub fn wins(&self, marker: Marker) -> bool {
        let owned = |row: usize, col: usize| self.cells[row][col] == Cell::Taken(marker);

        let any_row = (0..BOARD_SIZE).any(|r| (0..BOARD_SIZE).all(|c| owned(r, c)));
        let any_col = (0..BOARD_SIZE).any(|c| (0..BOARD_SIZE).all(|r| owned(r, c)));
        let diag = (0..BOARD_SIZE).all(|i| owned(i, i));
        let anti_diag = (0..BOARD_SIZE).all(|i| owned(BOARD_SIZE - 1 - i, i));

        any_row || any_col || diag || anti_diag
    }

    /// Whether the game is drawn: no empty cell and no winner.
    pub fn draws(&self) -> bool {
        let full = self
            .cells
            .iter()
            .all(|row| row.iter().all(|cell| *cell != Cell::Empty));
        full && !self.wins(Marker::Cross) && !self.wins(Marker::Nought)
    }

    /// Encode as the 9-digit status string.
    pub fn encode(&self) -> String {
        let mut status = String::with_capacity(BOARD_SIZE * BOARD_SIZE);
        for row in &self.cells {
            for cell in row {
                status.push(match cell {
                    Cell::Empty => '0',
                    Cell::Taken(marker) => marker.as_digit(),
                });
            }
        }
        status
    }

    /// Decode a 9-digit status string back into a board.
    ///
    /// Returns `None` if the string has the wrong length or contains a
    /// character outside `0` / `1` / `2`.
    pub fn decode(status: &str) -> Option<Self> {
        let mut chars = status.chars();
        let mut board = Board::new();
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                let c = chars.next()?;
                board.cells[row][col] = match c {
                    '0' => Cell::Empty,
                    _ => Cell::Taken(Marker::from_digit(c)?),
                };
            }
        }
        if chars.next().is_some() {
            return None;
        }
        Some(board)
    }
}
