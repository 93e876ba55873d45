//! Rooms: lobby pairing, game lifecycle, turn ordering.
//!
//! A room is created **pending** with its creator in slot 1; the second
//! PLAYER join flips it to **full** exactly once (board reset, slot 1 to
//! move) and the game runs until a win, a draw, a forfeit, or a player's
//! disconnect. Destruction releases every member and frees the name.
//!
//! Pending and full rooms live in separate maps, and a room is always in
//! exactly one of them. The manager never touches sockets: outcomes carry
//! the logical messages and the recipient ids, the lobby does the sending.

use std::collections::BTreeMap;

use ttt_core::{Board, JoinMode, Marker, ServerMessage};

use crate::types::ClientId;

/// Cap on simultaneously existing rooms, pending and full together.
pub const ROOM_LIMIT: usize = 2;

/// Room names must be shorter than this many characters.
pub const MAX_NAME_LEN: usize = 20;

/// Valid room name: under 20 chars, alphanumeric / `-` / `_` / space only.
pub fn valid_room_name(name: &str) -> bool {
    name.chars().count() < MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == ' ')
}

/// One room: up to two players plus any number of viewers.
#[derive(Debug)]
struct Room {
    player1: (String, ClientId),
    player2: Option<(String, ClientId)>,
    viewers: Vec<ClientId>,
    /// Marker of the player to move. Slot 1 plays `Cross` and opens.
    turn: Marker,
    board: Board,
}

impl Room {
    fn new(creator: &str, id: ClientId) -> Self {
        Room {
            player1: (creator.to_string(), id),
            player2: None,
            viewers: Vec::new(),
            turn: Marker::Cross,
            board: Board::new(),
        }
    }

    /// Players first, then viewers in join order.
    fn occupants(&self) -> Vec<ClientId> {
        let mut ids = vec![self.player1.1];
        if let Some((_, id)) = &self.player2 {
            ids.push(*id);
        }
        ids.extend(&self.viewers);
        ids
    }

    /// The seat of a connection: its marker and username, if a player.
    fn seat(&self, id: ClientId) -> Option<(Marker, &str)> {
        if self.player1.1 == id {
            return Some((Marker::Cross, &self.player1.0));
        }
        match &self.player2 {
            Some((name, pid)) if *pid == id => Some((Marker::Nought, name)),
            _ => None,
        }
    }

    /// Username of the player holding `marker`.
    fn player_name(&self, marker: Marker) -> Option<&str> {
        match marker {
            Marker::Cross => Some(&self.player1.0),
            Marker::Nought => self.player2.as_ref().map(|(name, _)| name.as_str()),
        }
    }
}

/// Outcome of a PLAYER-mode join.
#[derive(Debug)]
pub enum JoinPlayerOutcome {
    NoSuchRoom,
    /// The room exists but already has both players.
    RoomFull,
    /// The joiner took slot 2; the game begins now.
    Began {
        player1: String,
        player2: String,
        recipients: Vec<ClientId>,
    },
}

/// Outcome of a VIEWER-mode join.
#[derive(Debug)]
pub enum JoinViewerOutcome {
    NoSuchRoom,
    Watching {
        /// Present when the joined room's game is already running.
        in_progress: Option<InProgress>,
    },
}

#[derive(Debug)]
pub struct InProgress {
    pub current_turn: String,
    pub opponent: String,
}

/// Outcome of a CREATE.
#[derive(Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    InvalidName,
    NameTaken,
    LimitReached,
}

/// Outcome of a PLACE.
#[derive(Debug)]
pub enum PlaceOutcome {
    /// The room is still pending; placement is a no-op.
    NotStarted,
    /// Viewer, out-of-turn player, or illegal cell: silently ignored.
    Rejected,
    /// Accepted; the game continues with the turn flipped.
    Advanced {
        status: String,
        recipients: Vec<ClientId>,
    },
    /// Accepted and terminal (win or draw); the room is gone.
    Ended(GameOver),
}

/// Outcome of a FORFEIT.
#[derive(Debug)]
pub enum ForfeitOutcome {
    /// Pending room or non-player sender: ignored.
    Rejected,
    Ended(GameOver),
}

/// Outcome of a member's disconnect.
#[derive(Debug)]
pub enum DisconnectOutcome {
    /// A viewer left; the room plays on.
    ViewerLeft,
    /// The pending room's sole player left; the room is gone, viewers
    /// released without any message.
    RoomClosed { released: Vec<ClientId> },
    /// A player dropped out of a running game: forfeit in favor of the
    /// opponent, delivered to everyone still connected.
    Forfeited(GameOver),
}

/// A destroyed room's terminal broadcast and bookkeeping.
#[derive(Debug)]
pub struct GameOver {
    pub message: ServerMessage,
    /// Who receives the terminal message.
    pub recipients: Vec<ClientId>,
    /// Whose room association must be cleared (recipients plus no one
    /// else; a disconnected player is already gone from the registry).
    pub released: Vec<ClientId>,
}

enum PlaceVerdict {
    Advance {
        status: String,
        recipients: Vec<ClientId>,
    },
    Win {
        status: String,
        placer: String,
    },
    Draw {
        status: String,
    },
}

/// Owns every pending and full room, keyed by name.
#[derive(Debug, Default)]
pub struct RoomManager {
    pending: BTreeMap<String, Room>,
    full: BTreeMap<String, Room>,
}

impl RoomManager {
    pub fn new() -> Self {
        RoomManager::default()
    }

    /// Room names visible in the given mode, sorted, pending first.
    ///
    /// PLAYER mode lists only pending rooms (the only ones that can still
    /// seat a player); VIEWER mode lists everything.
    pub fn list(&self, mode: JoinMode) -> Vec<String> {
        match mode {
            JoinMode::Player => self.pending.keys().cloned().collect(),
            JoinMode::Viewer => self
                .pending
                .keys()
                .chain(self.full.keys())
                .cloned()
                .collect(),
        }
    }

    /// Create a pending room with `creator` in slot 1.
    ///
    /// Check order follows the reference behavior: capacity before name
    /// validity before uniqueness.
    pub fn create(&mut self, name: &str, creator: &str, id: ClientId) -> CreateOutcome {
        if self.pending.len() + self.full.len() >= ROOM_LIMIT {
            return CreateOutcome::LimitReached;
        }
        if !valid_room_name(name) {
            return CreateOutcome::InvalidName;
        }
        if self.pending.contains_key(name) || self.full.contains_key(name) {
            return CreateOutcome::NameTaken;
        }
        self.pending.insert(name.to_string(), Room::new(creator, id));
        CreateOutcome::Created
    }

    /// Seat `username` as the second player of a pending room.
    ///
    /// Flips the room pending -> full atomically: slot 2 filled, board
    /// already empty, slot 1 to move, BEGIN owed to every occupant.
    pub fn join_player(&mut self, name: &str, username: &str, id: ClientId) -> JoinPlayerOutcome {
        if !self.pending.contains_key(name) {
            return if self.full.contains_key(name) {
                JoinPlayerOutcome::RoomFull
            } else {
                JoinPlayerOutcome::NoSuchRoom
            };
        }
        let Some(mut room) = self.pending.remove(name) else {
            return JoinPlayerOutcome::NoSuchRoom;
        };
        room.player2 = Some((username.to_string(), id));
        let player1 = room.player1.0.clone();
        let recipients = room.occupants();
        self.full.insert(name.to_string(), room);
        JoinPlayerOutcome::Began {
            player1,
            player2: username.to_string(),
            recipients,
        }
    }

    /// Add a viewer to a pending or full room.
    pub fn join_viewer(&mut self, name: &str, id: ClientId) -> JoinViewerOutcome {
        if let Some(room) = self.pending.get_mut(name) {
            room.viewers.push(id);
            return JoinViewerOutcome::Watching { in_progress: None };
        }
        if let Some(room) = self.full.get_mut(name) {
            room.viewers.push(id);
            let in_progress = match (
                room.player_name(room.turn),
                room.player_name(room.turn.opponent()),
            ) {
                (Some(current_turn), Some(opponent)) => Some(InProgress {
                    current_turn: current_turn.to_string(),
                    opponent: opponent.to_string(),
                }),
                _ => None,
            };
            return JoinViewerOutcome::Watching { in_progress };
        }
        JoinViewerOutcome::NoSuchRoom
    }

    /// Apply a placement at column `col`, row `row` by connection `id`.
    ///
    /// Only the player whose turn it is may place; anything else is a
    /// silent no-op (the wire protocol has no rejection code for PLACE).
    pub fn place(&mut self, name: &str, id: ClientId, col: u8, row: u8) -> PlaceOutcome {
        if self.pending.contains_key(name) {
            return PlaceOutcome::NotStarted;
        }
        let verdict = {
            let Some(room) = self.full.get_mut(name) else {
                return PlaceOutcome::Rejected;
            };
            let Some((marker, placer)) = room.seat(id) else {
                return PlaceOutcome::Rejected;
            };
            let placer = placer.to_string();
            if marker != room.turn {
                return PlaceOutcome::Rejected;
            }
            if room
                .board
                .place(row as usize, col as usize, marker)
                .is_err()
            {
                return PlaceOutcome::Rejected;
            }
            let status = room.board.encode();
            if room.board.wins(marker) {
                PlaceVerdict::Win { status, placer }
            } else if room.board.draws() {
                PlaceVerdict::Draw { status }
            } else {
                room.turn = marker.opponent();
                PlaceVerdict::Advance {
                    status,
                    recipients: room.occupants(),
                }
            }
        };
        match verdict {
            PlaceVerdict::Advance { status, recipients } => {
                PlaceOutcome::Advanced { status, recipients }
            }
            PlaceVerdict::Win { status, placer } => PlaceOutcome::Ended(
                self.close_full(name, ServerMessage::game_end_win(status, placer)),
            ),
            PlaceVerdict::Draw { status } => PlaceOutcome::Ended(
                self.close_full(name, ServerMessage::game_end_draw(status)),
            ),
        }
    }

    /// Surrender by connection `id`: the opponent wins.
    pub fn forfeit(&mut self, name: &str, id: ClientId) -> ForfeitOutcome {
        let (status, winner) = {
            let Some(room) = self.full.get(name) else {
                // Pending room: no opponent to win yet.
                return ForfeitOutcome::Rejected;
            };
            let Some((marker, _)) = room.seat(id) else {
                return ForfeitOutcome::Rejected;
            };
            let Some(winner) = room.player_name(marker.opponent()) else {
                return ForfeitOutcome::Rejected;
            };
            (room.board.encode(), winner.to_string())
        };
        ForfeitOutcome::Ended(self.close_full(name, ServerMessage::game_end_forfeit(status, winner)))
    }

    /// Handle a member's connection dropping.
    pub fn disconnect(&mut self, name: &str, id: ClientId) -> DisconnectOutcome {
        if let Some(room) = self.pending.get_mut(name) {
            if room.player1.1 != id {
                room.viewers.retain(|v| *v != id);
                return DisconnectOutcome::ViewerLeft;
            }
            let released = match self.pending.remove(name) {
                Some(room) => room
                    .occupants()
                    .into_iter()
                    .filter(|c| *c != id)
                    .collect(),
                None => Vec::new(),
            };
            return DisconnectOutcome::RoomClosed { released };
        }

        let dropped_seat = {
            let Some(room) = self.full.get_mut(name) else {
                return DisconnectOutcome::ViewerLeft;
            };
            match room.seat(id) {
                Some((marker, _)) => {
                    let winner = room.player_name(marker.opponent()).map(str::to_string);
                    let status = room.board.encode();
                    winner.map(|w| (status, w))
                }
                None => {
                    room.viewers.retain(|v| *v != id);
                    return DisconnectOutcome::ViewerLeft;
                }
            }
        };
        let Some((status, winner)) = dropped_seat else {
            return DisconnectOutcome::ViewerLeft;
        };
        let mut over = self.close_full(name, ServerMessage::game_end_forfeit(status, winner));
        over.recipients.retain(|c| *c != id);
        over.released.retain(|c| *c != id);
        DisconnectOutcome::Forfeited(over)
    }

    /// Total rooms, pending and full.
    pub fn room_count(&self) -> usize {
        self.pending.len() + self.full.len()
    }

    /// Destroy a full room, collecting its terminal broadcast targets.
    fn close_full(&mut self, name: &str, message: ServerMessage) -> GameOver {
        let recipients = match self.full.remove(name) {
            Some(room) => room.occupants(),
            None => Vec::new(),
        };
        GameOver {
            message,
            released: recipients.clone(),
            recipients,
        }
    }
}
