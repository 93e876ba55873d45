//! Colon-delimited line codec.
//!
//! One validating parse step turns a complete client line into a typed
//! [`ClientMessage`]; downstream handlers never re-split raw strings.
//! Formatting is the inverse for [`ServerMessage`].
//!
//! Field payloads may not contain `:` or `\n` — an accepted constraint of
//! the encoding, not enforced beyond the field-count checks here.
//!
//! Client lines:
//!
//! - `LOGIN:user:pass`
//! - `REGISTER:user:pass`
//! - `ROOMLIST:PLAYER|VIEWER`
//! - `CREATE:name`
//! - `JOIN:name:PLAYER|VIEWER`
//! - `PLACE:col:row`
//! - `FORFEIT`

use thiserror::Error;

use ttt_core::messages::{ClientMessage, GameOutcome, JoinMode, ServerMessage, Verb};

/// Why a client line failed to parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Known verb, wrong shape (field count, bad mode, non-numeric
    /// coordinate). The verb is kept so the dispatcher can answer with
    /// that verb's malformed status code.
    #[error("malformed {} message", .0.as_str())]
    Malformed(Verb),

    /// The first field is not a known verb.
    #[error("unknown verb {0:?}")]
    UnknownVerb(String),
}

/// Parse one complete line (newline already stripped) into a typed message.
pub fn parse_line(line: &str) -> Result<ClientMessage, ParseError> {
    let fields: Vec<&str> = line.split(':').collect();
    let verb = Verb::from_token(fields[0])
        .ok_or_else(|| ParseError::UnknownVerb(fields[0].to_string()))?;
    let malformed = || ParseError::Malformed(verb);

    match verb {
        Verb::Login | Verb::Register => {
            if fields.len() != 3 {
                return Err(malformed());
            }
            let username = fields[1].to_string();
            let password = fields[2].to_string();
            Ok(match verb {
                Verb::Login => ClientMessage::Login { username, password },
                _ => ClientMessage::Register { username, password },
            })
        }
        Verb::RoomList => {
            if fields.len() != 2 {
                return Err(malformed());
            }
            let mode = JoinMode::from_token(fields[1]).ok_or_else(malformed)?;
            Ok(ClientMessage::RoomList { mode })
        }
        Verb::Create => {
            if fields.len() != 2 {
                return Err(malformed());
            }
            Ok(ClientMessage::Create {
                name: fields[1].to_string(),
            })
        }
        Verb::Join => {
            if fields.len() != 3 {
                return Err(malformed());
            }
            let mode = JoinMode::from_token(fields[2]).ok_or_else(malformed)?;
            Ok(ClientMessage::Join {
                name: fields[1].to_string(),
                mode,
            })
        }
        Verb::Place => {
            if fields.len() != 3 {
                return Err(malformed());
            }
            let col = fields[1].parse::<u8>().map_err(|_| malformed())?;
            let row = fields[2].parse::<u8>().map_err(|_| malformed())?;
            Ok(ClientMessage::Place { col, row })
        }
        Verb::Forfeit => {
            if fields.len() != 1 {
                return Err(malformed());
            }
            Ok(ClientMessage::Forfeit)
        }
    }
}

/// Format a server message as a wire line (without the trailing newline).
pub fn format_line(msg: &ServerMessage) -> String {
    match msg {
        ServerMessage::LoginAck(code) => format!("LOGIN:ACKSTATUS:{code}"),
        ServerMessage::RegisterAck(code) => format!("REGISTER:ACKSTATUS:{code}"),
        ServerMessage::RoomListAck { status, rooms } => {
            if *status == 0 {
                format!("ROOMLIST:ACKSTATUS:0:{}", rooms.join(","))
            } else {
                format!("ROOMLIST:ACKSTATUS:{status}")
            }
        }
        ServerMessage::CreateAck(code) => format!("CREATE:ACKSTATUS:{code}"),
        ServerMessage::JoinAck(code) => format!("JOIN:ACKSTATUS:{code}"),
        ServerMessage::BadAuth => "BADAUTH".to_string(),
        ServerMessage::NoRoom => "NOROOM".to_string(),
        ServerMessage::Begin { player1, player2 } => format!("BEGIN:{player1}:{player2}"),
        ServerMessage::InProgress {
            current_turn,
            opponent,
        } => format!("INPROGRESS:{current_turn}:{opponent}"),
        ServerMessage::BoardStatus(status) => format!("BOARDSTATUS:{status}"),
        ServerMessage::GameEnd { status, outcome } => match outcome {
            GameOutcome::Win { winner } | GameOutcome::Forfeit { winner } => {
                format!("GAMEEND:{status}:{}:{winner}", outcome.code())
            }
            GameOutcome::Draw => format!("GAMEEND:{status}:1"),
        },
    }
}
