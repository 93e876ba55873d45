//! Central lobby: the one task that owns all mutable state.
//!
//! Client tasks do I/O only; every decoded line and every connect or
//! disconnect event funnels through one mpsc channel into
//! [`run_lobby_loop`], so the connection registry, the auth store, and
//! the room manager are mutated by exactly one task. No locks, no
//! interleaving: each event runs to completion before the next.
//!
//! [`Lobby`] itself is synchronous and socket-free — handlers return
//! `(ClientId, ServerMessage)` batches — which keeps the whole dispatch
//! table unit-testable without a runtime.

use std::collections::HashMap;
use std::net::SocketAddr;

use tracing::{debug, info, warn};

use ttt_core::messages::ack;
use ttt_core::{ClientMessage, JoinMode, ServerMessage, Verb};
use ttt_protocol::{parse_line, ParseError};

use crate::auth::{AuthStore, LoginResult, RegisterResult};
use crate::rooms::{
    CreateOutcome, DisconnectOutcome, ForfeitOutcome, GameOver, JoinPlayerOutcome,
    JoinViewerOutcome, PlaceOutcome, RoomManager,
};
use crate::types::{ClientId, LobbyRequest, LobbyRx, OutboundTx};

/// A message owed to one client.
pub type Outbound = (ClientId, ServerMessage);

/// Per-connection metadata.
#[derive(Debug)]
struct Connection {
    peer_addr: SocketAddr,
    /// Set at most once, on the first successful LOGIN; revoked only by
    /// disconnect.
    username: Option<String>,
    /// At most one room membership at a time.
    room: Option<String>,
}

/// The lobby state machine: registry + auth store + rooms.
#[derive(Debug)]
pub struct Lobby {
    connections: HashMap<ClientId, Connection>,
    auth: AuthStore,
    rooms: RoomManager,
}

impl Lobby {
    pub fn new(auth: AuthStore) -> Self {
        Lobby {
            connections: HashMap::new(),
            auth,
            rooms: RoomManager::new(),
        }
    }

    /// Register a freshly accepted connection.
    pub fn connect(&mut self, id: ClientId, peer_addr: SocketAddr) {
        info!(client = id.0, %peer_addr, "new connection");
        self.connections.insert(
            id,
            Connection {
                peer_addr,
                username: None,
                room: None,
            },
        );
    }

    /// Tear down a connection; a player dropping out of a running game
    /// forfeits in favor of the opponent.
    pub fn disconnect(&mut self, id: ClientId) -> Vec<Outbound> {
        let Some(conn) = self.connections.remove(&id) else {
            return Vec::new();
        };
        info!(client = id.0, peer_addr = %conn.peer_addr, "disconnection");
        let Some(room_name) = conn.room else {
            return Vec::new();
        };
        match self.rooms.disconnect(&room_name, id) {
            DisconnectOutcome::ViewerLeft => Vec::new(),
            DisconnectOutcome::RoomClosed { released } => {
                self.release(&released);
                Vec::new()
            }
            DisconnectOutcome::Forfeited(over) => self.deliver_game_over(over),
        }
    }

    /// Process one complete decoded line from a connection.
    pub fn handle_line(&mut self, id: ClientId, line: &str) -> Vec<Outbound> {
        if line.is_empty() {
            return Vec::new();
        }
        debug!(client = id.0, line, "received");
        match parse_line(line) {
            Ok(msg) => self.dispatch(id, msg),
            Err(ParseError::Malformed(verb)) => self.handle_malformed(id, verb),
            Err(ParseError::UnknownVerb(_)) => {
                // Unknown verbs still hit the auth gate; past it they are
                // silently ignored (reference behavior).
                if !self.is_authenticated(id) {
                    vec![(id, ServerMessage::BadAuth)]
                } else {
                    Vec::new()
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Dispatch / precondition table
    // -------------------------------------------------------------------------

    /// Known verb, wrong shape: the auth gate still applies, then the
    /// verb's malformed status code (PLACE/FORFEIT have none and fall
    /// under the room gate instead).
    fn handle_malformed(&mut self, id: ClientId, verb: Verb) -> Vec<Outbound> {
        match verb {
            Verb::Login => vec![(id, ServerMessage::LoginAck(ack::login::MALFORMED))],
            Verb::Register => vec![(id, ServerMessage::RegisterAck(ack::register::MALFORMED))],
            _ if !self.is_authenticated(id) => vec![(id, ServerMessage::BadAuth)],
            Verb::RoomList => vec![(
                id,
                ServerMessage::RoomListAck {
                    status: ack::roomlist::INVALID_MODE,
                    rooms: Vec::new(),
                },
            )],
            Verb::Create => vec![(id, ServerMessage::CreateAck(ack::create::MALFORMED))],
            Verb::Join => vec![(id, ServerMessage::JoinAck(ack::join::MALFORMED))],
            Verb::Place | Verb::Forfeit => {
                if self.room_of(id).is_none() {
                    vec![(id, ServerMessage::NoRoom)]
                } else {
                    debug!(client = id.0, verb = verb.as_str(), "ignoring malformed");
                    Vec::new()
                }
            }
        }
    }

    fn dispatch(&mut self, id: ClientId, msg: ClientMessage) -> Vec<Outbound> {
        // LOGIN and REGISTER bypass every gate; everything else is
        // authenticated-only.
        let bypasses_auth = matches!(
            msg,
            ClientMessage::Login { .. } | ClientMessage::Register { .. }
        );
        if !bypasses_auth && !self.is_authenticated(id) {
            return vec![(id, ServerMessage::BadAuth)];
        }

        match msg {
            ClientMessage::Login { username, password } => {
                self.handle_login(id, &username, &password)
            }
            ClientMessage::Register { username, password } => {
                self.handle_register(id, &username, &password)
            }
            ClientMessage::RoomList { mode } => vec![(
                id,
                ServerMessage::RoomListAck {
                    status: ack::roomlist::OK,
                    rooms: self.rooms.list(mode),
                },
            )],
            ClientMessage::Create { name } => self.handle_create(id, &name),
            ClientMessage::Join { name, mode } => self.handle_join(id, &name, mode),
            ClientMessage::Place { col, row } => self.handle_place(id, col, row),
            ClientMessage::Forfeit => self.handle_forfeit(id),
        }
    }

    // -------------------------------------------------------------------------
    // Handlers
    // -------------------------------------------------------------------------

    fn handle_login(&mut self, id: ClientId, username: &str, password: &str) -> Vec<Outbound> {
        let code = match self.auth.login(username, password) {
            LoginResult::Accepted => {
                let Some(conn) = self.connections.get_mut(&id) else {
                    return Vec::new();
                };
                // Identity is set at most once; a re-login never swaps it.
                if conn.username.is_none() {
                    conn.username = Some(username.to_string());
                    info!(client = id.0, username, "authenticated");
                }
                ack::login::OK
            }
            LoginResult::UnknownUser => ack::login::UNKNOWN_USER,
            LoginResult::WrongPassword => ack::login::WRONG_PASSWORD,
        };
        vec![(id, ServerMessage::LoginAck(code))]
    }

    fn handle_register(&mut self, id: ClientId, username: &str, password: &str) -> Vec<Outbound> {
        let code = match self.auth.register(username, password) {
            Ok(RegisterResult::Created) => {
                info!(client = id.0, username, "registered");
                ack::register::OK
            }
            Ok(RegisterResult::AlreadyExists) => ack::register::EXISTS,
            Err(err) => {
                warn!(client = id.0, error = %err, "registration failed");
                ack::register::MALFORMED
            }
        };
        vec![(id, ServerMessage::RegisterAck(code))]
    }

    fn handle_create(&mut self, id: ClientId, name: &str) -> Vec<Outbound> {
        // A connection holds at most one room membership.
        if self.room_of(id).is_some() {
            return vec![(id, ServerMessage::CreateAck(ack::create::MALFORMED))];
        }
        let Some(creator) = self.username_of(id) else {
            return vec![(id, ServerMessage::BadAuth)];
        };
        let code = match self.rooms.create(name, &creator, id) {
            CreateOutcome::Created => {
                self.set_room(id, Some(name.to_string()));
                info!(client = id.0, room = name, "room created");
                ack::create::OK
            }
            CreateOutcome::InvalidName => ack::create::INVALID_NAME,
            CreateOutcome::NameTaken => ack::create::EXISTS,
            CreateOutcome::LimitReached => ack::create::LIMIT,
        };
        vec![(id, ServerMessage::CreateAck(code))]
    }

    fn handle_join(&mut self, id: ClientId, name: &str, mode: JoinMode) -> Vec<Outbound> {
        if self.room_of(id).is_some() {
            return vec![(id, ServerMessage::JoinAck(ack::join::MALFORMED))];
        }
        let Some(username) = self.username_of(id) else {
            return vec![(id, ServerMessage::BadAuth)];
        };
        match mode {
            JoinMode::Player => match self.rooms.join_player(name, &username, id) {
                JoinPlayerOutcome::NoSuchRoom => {
                    vec![(id, ServerMessage::JoinAck(ack::join::NO_SUCH_ROOM))]
                }
                JoinPlayerOutcome::RoomFull => {
                    vec![(id, ServerMessage::JoinAck(ack::join::FULL))]
                }
                JoinPlayerOutcome::Began {
                    player1,
                    player2,
                    recipients,
                } => {
                    self.set_room(id, Some(name.to_string()));
                    info!(client = id.0, room = name, "game begins");
                    let begin = ServerMessage::Begin { player1, player2 };
                    let mut out: Vec<Outbound> = recipients
                        .into_iter()
                        .map(|rid| (rid, begin.clone()))
                        .collect();
                    out.push((id, ServerMessage::JoinAck(ack::join::OK)));
                    out
                }
            },
            JoinMode::Viewer => match self.rooms.join_viewer(name, id) {
                JoinViewerOutcome::NoSuchRoom => {
                    vec![(id, ServerMessage::JoinAck(ack::join::NO_SUCH_ROOM))]
                }
                JoinViewerOutcome::Watching { in_progress } => {
                    self.set_room(id, Some(name.to_string()));
                    let mut out = vec![(id, ServerMessage::JoinAck(ack::join::OK))];
                    if let Some(info) = in_progress {
                        out.push((
                            id,
                            ServerMessage::InProgress {
                                current_turn: info.current_turn,
                                opponent: info.opponent,
                            },
                        ));
                    }
                    out
                }
            },
        }
    }

    fn handle_place(&mut self, id: ClientId, col: u8, row: u8) -> Vec<Outbound> {
        let Some(room_name) = self.room_of(id) else {
            return vec![(id, ServerMessage::NoRoom)];
        };
        match self.rooms.place(&room_name, id, col, row) {
            PlaceOutcome::NotStarted | PlaceOutcome::Rejected => {
                debug!(client = id.0, room = %room_name, col, row, "placement ignored");
                Vec::new()
            }
            PlaceOutcome::Advanced { status, recipients } => {
                let update = ServerMessage::BoardStatus(status);
                recipients
                    .into_iter()
                    .map(|rid| (rid, update.clone()))
                    .collect()
            }
            PlaceOutcome::Ended(over) => self.deliver_game_over(over),
        }
    }

    fn handle_forfeit(&mut self, id: ClientId) -> Vec<Outbound> {
        let Some(room_name) = self.room_of(id) else {
            return vec![(id, ServerMessage::NoRoom)];
        };
        match self.rooms.forfeit(&room_name, id) {
            ForfeitOutcome::Rejected => {
                debug!(client = id.0, room = %room_name, "forfeit ignored");
                Vec::new()
            }
            ForfeitOutcome::Ended(over) => self.deliver_game_over(over),
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn is_authenticated(&self, id: ClientId) -> bool {
        self.connections
            .get(&id)
            .is_some_and(|conn| conn.username.is_some())
    }

    fn username_of(&self, id: ClientId) -> Option<String> {
        self.connections.get(&id)?.username.clone()
    }

    fn room_of(&self, id: ClientId) -> Option<String> {
        self.connections.get(&id)?.room.clone()
    }

    fn set_room(&mut self, id: ClientId, room: Option<String>) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.room = room;
        }
    }

    /// Clear the room association of every released member.
    fn release(&mut self, members: &[ClientId]) {
        for member in members {
            self.set_room(*member, None);
        }
    }

    /// Fan a terminal message out to the destroyed room's occupants.
    fn deliver_game_over(&mut self, over: GameOver) -> Vec<Outbound> {
        let GameOver {
            message,
            recipients,
            released,
        } = over;
        self.release(&released);
        recipients
            .into_iter()
            .map(|rid| (rid, message.clone()))
            .collect()
    }
}

/// Run the central lobby loop.
///
/// Owns the `Lobby` and the map from client ids to outbound channels;
/// dropping a client's sender (on disconnect) closes its writer task.
pub async fn run_lobby_loop(mut lobby_rx: LobbyRx, auth: AuthStore) {
    let mut lobby = Lobby::new(auth);
    let mut senders: HashMap<ClientId, OutboundTx> = HashMap::new();

    while let Some(req) = lobby_rx.recv().await {
        match req {
            LobbyRequest::Connected {
                client_id,
                peer_addr,
                out_tx,
            } => {
                senders.insert(client_id, out_tx);
                lobby.connect(client_id, peer_addr);
            }
            LobbyRequest::Line { client_id, line } => {
                send_all(&senders, lobby.handle_line(client_id, &line));
            }
            LobbyRequest::Disconnected { client_id } => {
                let outbound = lobby.disconnect(client_id);
                senders.remove(&client_id);
                send_all(&senders, outbound);
            }
        }
    }

    info!("lobby loop shutting down (request channel closed)");
}

fn send_all(senders: &HashMap<ClientId, OutboundTx>, outbound: Vec<Outbound>) {
    for (client_id, msg) in outbound {
        if let Some(tx) = senders.get(&client_id) {
            // A send failure means the client task is already gone; its
            // Disconnected event is on the queue.
            let _ = tx.send(msg);
        }
    }
}
