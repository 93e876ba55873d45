//! Logical client/server messages.
//!
//! These are **transport-agnostic**: the newline/colon wire codec lives in
//! the `ttt-protocol` crate; this module is purely logical.
//!
//! - [`ClientMessage`]: what the lobby consumes (already validated).
//! - [`ServerMessage`]: what the lobby produces (unicast or broadcast).

/// Protocol verbs, as they appear in the first field of a client line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Verb {
    Login,
    Register,
    RoomList,
    Create,
    Join,
    Place,
    Forfeit,
}

impl Verb {
    /// Parse the leading field of a client line.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "LOGIN" => Some(Verb::Login),
            "REGISTER" => Some(Verb::Register),
            "ROOMLIST" => Some(Verb::RoomList),
            "CREATE" => Some(Verb::Create),
            "JOIN" => Some(Verb::Join),
            "PLACE" => Some(Verb::Place),
            "FORFEIT" => Some(Verb::Forfeit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Login => "LOGIN",
            Verb::Register => "REGISTER",
            Verb::RoomList => "ROOMLIST",
            Verb::Create => "CREATE",
            Verb::Join => "JOIN",
            Verb::Place => "PLACE",
            Verb::Forfeit => "FORFEIT",
        }
    }
}

/// Room access mode for `ROOMLIST` and `JOIN`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JoinMode {
    Player,
    Viewer,
}

impl JoinMode {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "PLAYER" => Some(JoinMode::Player),
            "VIEWER" => Some(JoinMode::Viewer),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JoinMode::Player => "PLAYER",
            JoinMode::Viewer => "VIEWER",
        }
    }
}

/// A validated request from a client.
///
/// Produced by the single validating parse step in `ttt-protocol`;
/// handlers never see raw field strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Login { username: String, password: String },
    Register { username: String, password: String },
    RoomList { mode: JoinMode },
    Create { name: String },
    Join { name: String, mode: JoinMode },
    /// Place a marker at column `col`, row `row` (both 0-based).
    Place { col: u8, row: u8 },
    Forfeit,
}

impl ClientMessage {
    pub fn verb(&self) -> Verb {
        match self {
            ClientMessage::Login { .. } => Verb::Login,
            ClientMessage::Register { .. } => Verb::Register,
            ClientMessage::RoomList { .. } => Verb::RoomList,
            ClientMessage::Create { .. } => Verb::Create,
            ClientMessage::Join { .. } => Verb::Join,
            ClientMessage::Place { .. } => Verb::Place,
            ClientMessage::Forfeit => Verb::Forfeit,
        }
    }
}

/// How a game ended, with the wire code and winner field (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    /// Code 0: three in a row.
    Win { winner: String },
    /// Code 1: full board, no winner.
    Draw,
    /// Code 2: explicit surrender or a player's disconnect.
    Forfeit { winner: String },
}

impl GameOutcome {
    pub fn code(&self) -> u8 {
        match self {
            GameOutcome::Win { .. } => 0,
            GameOutcome::Draw => 1,
            GameOutcome::Forfeit { .. } => 2,
        }
    }
}

/// A message from the server to one client (or broadcast to a room).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    LoginAck(u8),
    RegisterAck(u8),
    /// `status` 0 carries the comma-joined room names; other statuses don't.
    RoomListAck { status: u8, rooms: Vec<String> },
    CreateAck(u8),
    JoinAck(u8),
    /// Any verb before authentication (other than LOGIN/REGISTER).
    BadAuth,
    /// PLACE/FORFEIT without a room membership.
    NoRoom,
    /// Broadcast when the second player joins and the game starts.
    Begin { player1: String, player2: String },
    /// Unicast to a viewer joining a room whose game is in progress.
    InProgress { current_turn: String, opponent: String },
    /// Broadcast after every accepted placement that doesn't end the game.
    BoardStatus(String),
    /// Broadcast terminal message; the room is destroyed right after.
    GameEnd { status: String, outcome: GameOutcome },
}

impl ServerMessage {
    pub fn game_end_win(status: impl Into<String>, winner: impl Into<String>) -> Self {
        ServerMessage::GameEnd {
            status: status.into(),
            outcome: GameOutcome::Win {
                winner: winner.into(),
            },
        }
    }

    pub fn game_end_draw(status: impl Into<String>) -> Self {
        ServerMessage::GameEnd {
            status: status.into(),
            outcome: GameOutcome::Draw,
        }
    }

    pub fn game_end_forfeit(status: impl Into<String>, winner: impl Into<String>) -> Self {
        ServerMessage::GameEnd {
            status: status.into(),
            outcome: GameOutcome::Forfeit {
                winner: winner.into(),
            },
        }
    }
}

/// ACKSTATUS codes, per verb.
pub mod ack {
    pub mod login {
        pub const OK: u8 = 0;
        pub const UNKNOWN_USER: u8 = 1;
        pub const WRONG_PASSWORD: u8 = 2;
        pub const MALFORMED: u8 = 3;
    }

    pub mod register {
        pub const OK: u8 = 0;
        pub const EXISTS: u8 = 1;
        pub const MALFORMED: u8 = 2;
    }

    pub mod roomlist {
        pub const OK: u8 = 0;
        pub const INVALID_MODE: u8 = 1;
    }

    pub mod create {
        pub const OK: u8 = 0;
        pub const INVALID_NAME: u8 = 1;
        pub const EXISTS: u8 = 2;
        pub const LIMIT: u8 = 3;
        pub const MALFORMED: u8 = 4;
    }

    pub mod join {
        pub const OK: u8 = 0;
        pub const NO_SUCH_ROOM: u8 = 1;
        pub const FULL: u8 = 2;
        pub const MALFORMED: u8 = 3;
    }
}
