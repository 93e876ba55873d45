//! ttt-core
//!
//! Pure tic-tac-toe lobby logic:
//! - markers and the board value type
//! - win / draw detection and status-string encoding
//! - logical client/server messages (transport-agnostic)

pub mod board;
pub mod error;
pub mod marker;
pub mod messages;

pub use board::{Board, Cell, BOARD_SIZE};
pub use error::PlaceError;
pub use marker::Marker;

pub use messages::{
    ack,
    ClientMessage,
    GameOutcome,
    JoinMode,
    ServerMessage,
    Verb,
};
