//! Error types for the core game logic.

use thiserror::Error;

/// Why a placement was rejected.
///
/// The server treats any rejected placement as a no-op; the reason is
/// surfaced for logging and tests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaceError {
    /// Row or column outside the 3x3 grid.
    #[error("position ({row},{col}) is outside the board")]
    OutOfRange { row: usize, col: usize },

    /// The target cell already holds a marker.
    #[error("position ({row},{col}) is already occupied")]
    Occupied { row: usize, col: usize },
}
