//! Player markers (cross / nought) and their wire digits.

/// A player's marker on the board.
///
/// Slot 1 of a room always plays `Cross`, slot 2 always plays `Nought`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Marker {
    Cross,
    Nought,
}

impl Marker {
    /// Wire digit for the board status string (`'1'` / `'2'`).
    pub fn as_digit(self) -> char {
        match self {
            Marker::Cross => '1',
            Marker::Nought => '2',
        }
    }

    /// Parse from a status-string digit (`'1'` / `'2'`).
    pub fn from_digit(c: char) -> Option<Self> {
        match c {
            '1' => Some(Marker::Cross),
            '2' => Some(Marker::Nought),
            _ => None,
        }
    }

    /// The other player's marker.
    pub fn opponent(self) -> Self {
        match self {
            Marker::Cross => Marker::Nought,
            Marker::Nought => Marker::Cross,
        }
    }
}
