//! Scenario tests driving the lobby state machine directly.
//!
//! `Lobby` is synchronous and socket-free, so these tests feed it raw
//! protocol lines and assert on the exact `(ClientId, ServerMessage)`
//! batches it owes — the same frames a wire client would see.

use std::net::SocketAddr;

use ttt_core::ServerMessage;
use ttt_server::auth::AuthStore;
use ttt_server::lobby::{Lobby, Outbound};
use ttt_server::types::ClientId;

fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

/// Build a lobby over a temp record store seeded with the given users.
/// Hashes use a cheap cost so logins stay fast.
fn lobby_with_users(tag: &str, users: &[(&str, &str)]) -> Lobby {
    let records: Vec<serde_json::Value> = users
        .iter()
        .map(|(username, password)| {
            serde_json::json!({
                "username": username,
                "password_hash": bcrypt::hash(password, 4).unwrap(),
            })
        })
        .collect();
    let path = std::env::temp_dir().join(format!(
        "ttt-lobby-{}-{tag}.json",
        std::process::id()
    ));
    std::fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();
    Lobby::new(AuthStore::load(&path).unwrap())
}

fn connect(lobby: &mut Lobby, id: u64) -> ClientId {
    let client_id = ClientId(id);
    lobby.connect(client_id, peer());
    client_id
}

fn login(lobby: &mut Lobby, id: ClientId, username: &str, password: &str) {
    let out = lobby.handle_line(id, &format!("LOGIN:{username}:{password}"));
    assert_eq!(out, vec![(id, ServerMessage::LoginAck(0))]);
}

/// Stand up alice (player 1, room created) and bob (player 2, joined),
/// returning their ids with the game already begun.
fn begun_game(lobby: &mut Lobby, room: &str) -> (ClientId, ClientId) {
    let alice = connect(lobby, 1);
    let bob = connect(lobby, 2);
    login(lobby, alice, "alice", "pw1");
    login(lobby, bob, "bob", "pw2");
    assert_eq!(
        lobby.handle_line(alice, &format!("CREATE:{room}")),
        vec![(alice, ServerMessage::CreateAck(0))]
    );
    let begin = ServerMessage::Begin {
        player1: "alice".into(),
        player2: "bob".into(),
    };
    assert_eq!(
        lobby.handle_line(bob, &format!("JOIN:{room}:PLAYER")),
        vec![
            (alice, begin.clone()),
            (bob, begin),
            (bob, ServerMessage::JoinAck(0)),
        ]
    );
    (alice, bob)
}

fn board_broadcast(recipients: &[ClientId], status: &str) -> Vec<Outbound> {
    recipients
        .iter()
        .map(|id| (*id, ServerMessage::BoardStatus(status.into())))
        .collect()
}

// -----------------------------------------------------------------------------
// Auth gating
// -----------------------------------------------------------------------------

#[test]
fn everything_but_login_and_register_is_gated() {
    let mut lobby = lobby_with_users("gate", &[]);
    let c = connect(&mut lobby, 1);

    for line in [
        "ROOMLIST:PLAYER",
        "CREATE:room1",
        "JOIN:room1:PLAYER",
        "PLACE:0:0",
        "FORFEIT",
        "NOTAVERB",
        "CREATE:too:many:fields",
    ] {
        assert_eq!(
            lobby.handle_line(c, line),
            vec![(c, ServerMessage::BadAuth)],
            "line {line:?} must be gated"
        );
    }
}

#[test]
fn login_status_codes() {
    let mut lobby = lobby_with_users("login", &[("alice", "pw1")]);
    let c = connect(&mut lobby, 1);

    assert_eq!(
        lobby.handle_line(c, "LOGIN:ghost:pw"),
        vec![(c, ServerMessage::LoginAck(1))]
    );
    assert_eq!(
        lobby.handle_line(c, "LOGIN:alice:wrong"),
        vec![(c, ServerMessage::LoginAck(2))]
    );
    assert_eq!(
        lobby.handle_line(c, "LOGIN:alice"),
        vec![(c, ServerMessage::LoginAck(3))]
    );
    assert_eq!(
        lobby.handle_line(c, "LOGIN:alice:pw1"),
        vec![(c, ServerMessage::LoginAck(0))]
    );
}

#[test]
fn identity_is_set_at_most_once() {
    let mut lobby = lobby_with_users("relogin", &[("alice", "pw1"), ("bob", "pw2")]);
    let c1 = connect(&mut lobby, 1);
    let c2 = connect(&mut lobby, 2);
    login(&mut lobby, c1, "alice", "pw1");

    // A second successful LOGIN acks but never swaps the identity.
    assert_eq!(
        lobby.handle_line(c1, "LOGIN:bob:pw2"),
        vec![(c1, ServerMessage::LoginAck(0))]
    );

    login(&mut lobby, c2, "bob", "pw2");
    lobby.handle_line(c1, "CREATE:room1");
    let out = lobby.handle_line(c2, "JOIN:room1:PLAYER");
    let begin = ServerMessage::Begin {
        player1: "alice".into(),
        player2: "bob".into(),
    };
    assert_eq!(out[0], (c1, begin));
}

#[test]
fn register_creates_then_conflicts() {
    let mut lobby = lobby_with_users("register", &[]);
    let c = connect(&mut lobby, 1);

    assert_eq!(
        lobby.handle_line(c, "REGISTER:carol:pw"),
        vec![(c, ServerMessage::RegisterAck(0))]
    );
    assert_eq!(
        lobby.handle_line(c, "REGISTER:carol:other"),
        vec![(c, ServerMessage::RegisterAck(1))]
    );
    assert_eq!(
        lobby.handle_line(c, "REGISTER:carol"),
        vec![(c, ServerMessage::RegisterAck(2))]
    );
    // Registration does not authenticate.
    assert_eq!(
        lobby.handle_line(c, "ROOMLIST:PLAYER"),
        vec![(c, ServerMessage::BadAuth)]
    );
    // But the fresh record logs in.
    login(&mut lobby, c, "carol", "pw");
}

// -----------------------------------------------------------------------------
// Rooms
// -----------------------------------------------------------------------------

#[test]
fn create_codes_and_room_limit() {
    let mut lobby = lobby_with_users(
        "create",
        &[("alice", "pw"), ("bob", "pw"), ("carol", "pw")],
    );
    let a = connect(&mut lobby, 1);
    let b = connect(&mut lobby, 2);
    let c = connect(&mut lobby, 3);
    login(&mut lobby, a, "alice", "pw");
    login(&mut lobby, b, "bob", "pw");
    login(&mut lobby, c, "carol", "pw");

    assert_eq!(
        lobby.handle_line(a, "CREATE:this name is far too long"),
        vec![(a, ServerMessage::CreateAck(1))]
    );
    assert_eq!(
        lobby.handle_line(a, "CREATE:bad!"),
        vec![(a, ServerMessage::CreateAck(1))]
    );
    assert_eq!(
        lobby.handle_line(a, "CREATE:room1"),
        vec![(a, ServerMessage::CreateAck(0))]
    );
    assert_eq!(
        lobby.handle_line(b, "CREATE:room1"),
        vec![(b, ServerMessage::CreateAck(2))]
    );
    assert_eq!(
        lobby.handle_line(b, "CREATE:room2"),
        vec![(b, ServerMessage::CreateAck(0))]
    );
    // ROOM_LIMIT is 2: the third room is refused.
    assert_eq!(
        lobby.handle_line(c, "CREATE:room3"),
        vec![(c, ServerMessage::CreateAck(3))]
    );
    // The creator is bound to the room; a second CREATE is a protocol
    // violation answered with the catch-all code.
    assert_eq!(
        lobby.handle_line(a, "CREATE:another"),
        vec![(a, ServerMessage::CreateAck(4))]
    );
}

#[test]
fn roomlist_modes_track_the_lifecycle() {
    let mut lobby = lobby_with_users(
        "roomlist",
        &[("alice", "pw"), ("bob", "pw"), ("carol", "pw")],
    );
    let a = connect(&mut lobby, 1);
    let b = connect(&mut lobby, 2);
    let c = connect(&mut lobby, 3);
    login(&mut lobby, a, "alice", "pw");
    login(&mut lobby, b, "bob", "pw");
    login(&mut lobby, c, "carol", "pw");

    lobby.handle_line(a, "CREATE:room1");
    lobby.handle_line(b, "CREATE:room2");

    let listing = |lobby: &mut Lobby, id, mode: &str| {
        lobby.handle_line(id, &format!("ROOMLIST:{mode}"))
    };
    assert_eq!(
        listing(&mut lobby, c, "PLAYER"),
        vec![(
            c,
            ServerMessage::RoomListAck {
                status: 0,
                rooms: vec!["room1".into(), "room2".into()]
            }
        )]
    );

    // room1 fills: players can no longer join it, viewers still see it.
    lobby.handle_line(c, "JOIN:room1:PLAYER");
    let d = connect(&mut lobby, 4);
    login(&mut lobby, d, "bob", "pw"); // same account, second connection
    assert_eq!(
        listing(&mut lobby, d, "PLAYER"),
        vec![(
            d,
            ServerMessage::RoomListAck {
                status: 0,
                rooms: vec!["room2".into()]
            }
        )]
    );
    assert_eq!(
        listing(&mut lobby, d, "VIEWER"),
        vec![(
            d,
            ServerMessage::RoomListAck {
                status: 0,
                rooms: vec!["room2".into(), "room1".into()]
            }
        )]
    );
    // Bad mode.
    assert_eq!(
        listing(&mut lobby, d, "BOTH"),
        vec![(
            d,
            ServerMessage::RoomListAck {
                status: 1,
                rooms: vec![]
            }
        )]
    );
}

#[test]
fn join_codes() {
    let mut lobby = lobby_with_users(
        "join",
        &[("alice", "pw1"), ("bob", "pw2"), ("carol", "pw")],
    );
    let (_, bob) = begun_game(&mut lobby, "room1");
    let c = connect(&mut lobby, 3);
    login(&mut lobby, c, "carol", "pw");

    assert_eq!(
        lobby.handle_line(c, "JOIN:ghost room:PLAYER"),
        vec![(c, ServerMessage::JoinAck(1))]
    );
    assert_eq!(
        lobby.handle_line(c, "JOIN:room1:PLAYER"),
        vec![(c, ServerMessage::JoinAck(2))]
    );
    assert_eq!(
        lobby.handle_line(c, "JOIN:room1:REFEREE"),
        vec![(c, ServerMessage::JoinAck(3))]
    );
    // A seated player cannot join elsewhere.
    assert_eq!(
        lobby.handle_line(bob, "JOIN:room1:VIEWER"),
        vec![(bob, ServerMessage::JoinAck(3))]
    );
}

#[test]
fn viewer_of_a_running_game_gets_inprogress() {
    let mut lobby = lobby_with_users(
        "viewer",
        &[("alice", "pw1"), ("bob", "pw2"), ("carol", "pw")],
    );
    let (alice, bob) = begun_game(&mut lobby, "room1");
    let v = connect(&mut lobby, 3);
    login(&mut lobby, v, "carol", "pw");

    // Alice has moved, so it's bob's turn when the viewer arrives.
    lobby.handle_line(alice, "PLACE:0:0");
    assert_eq!(
        lobby.handle_line(v, "JOIN:room1:VIEWER"),
        vec![
            (v, ServerMessage::JoinAck(0)),
            (
                v,
                ServerMessage::InProgress {
                    current_turn: "bob".into(),
                    opponent: "alice".into(),
                }
            ),
        ]
    );
    // From here the viewer receives board broadcasts.
    assert_eq!(
        lobby.handle_line(bob, "PLACE:1:0"),
        board_broadcast(&[alice, bob, v], "120000000")
    );
}

#[test]
fn viewer_of_a_pending_room_waits_silently() {
    let mut lobby = lobby_with_users("pendview", &[("alice", "pw"), ("carol", "pw")]);
    let a = connect(&mut lobby, 1);
    let v = connect(&mut lobby, 2);
    login(&mut lobby, a, "alice", "pw");
    login(&mut lobby, v, "carol", "pw");

    lobby.handle_line(a, "CREATE:room1");
    assert_eq!(
        lobby.handle_line(v, "JOIN:room1:VIEWER"),
        vec![(v, ServerMessage::JoinAck(0))]
    );
}

// -----------------------------------------------------------------------------
// Gameplay
// -----------------------------------------------------------------------------

#[test]
fn opening_moves_broadcast_board_status() {
    let mut lobby = lobby_with_users("opening", &[("alice", "pw1"), ("bob", "pw2")]);
    let (alice, bob) = begun_game(&mut lobby, "room1");

    assert_eq!(
        lobby.handle_line(alice, "PLACE:0:0"),
        board_broadcast(&[alice, bob], "100000000")
    );
    assert_eq!(
        lobby.handle_line(bob, "PLACE:1:0"),
        board_broadcast(&[alice, bob], "120000000")
    );
}

#[test]
fn out_of_turn_and_illegal_placements_are_silent() {
    let mut lobby = lobby_with_users("turns", &[("alice", "pw1"), ("bob", "pw2")]);
    let (alice, bob) = begun_game(&mut lobby, "room1");

    // Bob tries to open: ignored, alice still to move.
    assert_eq!(lobby.handle_line(bob, "PLACE:0:0"), vec![]);
    assert_eq!(
        lobby.handle_line(alice, "PLACE:0:0"),
        board_broadcast(&[alice, bob], "100000000")
    );
    // Occupied cell and out-of-range: ignored, turn unchanged.
    assert_eq!(lobby.handle_line(bob, "PLACE:0:0"), vec![]);
    assert_eq!(lobby.handle_line(bob, "PLACE:9:0"), vec![]);
    assert_eq!(
        lobby.handle_line(bob, "PLACE:1:0"),
        board_broadcast(&[alice, bob], "120000000")
    );
}

#[test]
fn place_and_forfeit_require_a_room() {
    let mut lobby = lobby_with_users("noroom", &[("alice", "pw")]);
    let c = connect(&mut lobby, 1);
    login(&mut lobby, c, "alice", "pw");

    assert_eq!(
        lobby.handle_line(c, "PLACE:0:0"),
        vec![(c, ServerMessage::NoRoom)]
    );
    assert_eq!(
        lobby.handle_line(c, "FORFEIT"),
        vec![(c, ServerMessage::NoRoom)]
    );
}

#[test]
fn place_in_a_pending_room_is_a_no_op() {
    let mut lobby = lobby_with_users("pendplace", &[("alice", "pw")]);
    let a = connect(&mut lobby, 1);
    login(&mut lobby, a, "alice", "pw");
    lobby.handle_line(a, "CREATE:room1");
    assert_eq!(lobby.handle_line(a, "PLACE:0:0"), vec![]);
}

#[test]
fn winning_line_ends_game_and_frees_the_room() {
    let mut lobby = lobby_with_users("win", &[("alice", "pw1"), ("bob", "pw2")]);
    let (alice, bob) = begun_game(&mut lobby, "room1");

    for (id, line) in [
        (alice, "PLACE:0:0"),
        (bob, "PLACE:1:0"),
        (alice, "PLACE:0:1"),
        (bob, "PLACE:1:1"),
    ] {
        assert!(!lobby.handle_line(id, line).is_empty());
    }
    // Alice completes the first column.
    let end = ServerMessage::game_end_win("120120100", "alice");
    assert_eq!(
        lobby.handle_line(alice, "PLACE:0:2"),
        vec![(alice, end.clone()), (bob, end)]
    );

    // The room is gone: not listed, not joinable, name reusable.
    assert_eq!(
        lobby.handle_line(alice, "ROOMLIST:VIEWER"),
        vec![(
            alice,
            ServerMessage::RoomListAck {
                status: 0,
                rooms: vec![]
            }
        )]
    );
    assert_eq!(
        lobby.handle_line(bob, "JOIN:room1:PLAYER"),
        vec![(bob, ServerMessage::JoinAck(1))]
    );
    assert_eq!(
        lobby.handle_line(alice, "CREATE:room1"),
        vec![(alice, ServerMessage::CreateAck(0))]
    );
}

#[test]
fn full_board_without_winner_is_a_draw() {
    let mut lobby = lobby_with_users("draw", &[("alice", "pw1"), ("bob", "pw2")]);
    let (alice, bob) = begun_game(&mut lobby, "room1");

    let moves = [
        (alice, "PLACE:0:0"),
        (bob, "PLACE:1:0"),
        (alice, "PLACE:2:0"),
        (bob, "PLACE:1:1"),
        (alice, "PLACE:0:1"),
        (bob, "PLACE:2:1"),
        (alice, "PLACE:1:2"),
        (bob, "PLACE:0:2"),
    ];
    for (id, line) in moves {
        assert!(!lobby.handle_line(id, line).is_empty());
    }
    let end = ServerMessage::game_end_draw("121122211");
    assert_eq!(
        lobby.handle_line(alice, "PLACE:2:2"),
        vec![(alice, end.clone()), (bob, end)]
    );
}

#[test]
fn forfeit_hands_the_win_to_the_opponent() {
    let mut lobby = lobby_with_users("forfeit", &[("alice", "pw1"), ("bob", "pw2")]);
    let (alice, bob) = begun_game(&mut lobby, "room1");

    lobby.handle_line(alice, "PLACE:0:0");
    let end = ServerMessage::game_end_forfeit("100000000", "alice");
    assert_eq!(
        lobby.handle_line(bob, "FORFEIT"),
        vec![(alice, end.clone()), (bob, end)]
    );
}

#[test]
fn player_disconnect_is_a_forfeit() {
    let mut lobby = lobby_with_users(
        "dropforfeit",
        &[("alice", "pw1"), ("bob", "pw2"), ("carol", "pw")],
    );
    let (alice, bob) = begun_game(&mut lobby, "room1");
    let v = connect(&mut lobby, 3);
    login(&mut lobby, v, "carol", "pw");
    lobby.handle_line(v, "JOIN:room1:VIEWER");

    let end = ServerMessage::game_end_forfeit("000000000", "alice");
    assert_eq!(
        lobby.disconnect(bob),
        vec![(alice, end.clone()), (v, end)]
    );
    // Alice and the viewer are released; the name is free again.
    assert_eq!(
        lobby.handle_line(alice, "CREATE:room1"),
        vec![(alice, ServerMessage::CreateAck(0))]
    );
    assert_eq!(
        lobby.handle_line(v, "JOIN:room1:VIEWER"),
        vec![(v, ServerMessage::JoinAck(0))]
    );
}

#[test]
fn viewer_disconnect_leaves_the_game_running() {
    let mut lobby = lobby_with_users(
        "viewdrop",
        &[("alice", "pw1"), ("bob", "pw2"), ("carol", "pw")],
    );
    let (alice, bob) = begun_game(&mut lobby, "room1");
    let v = connect(&mut lobby, 3);
    login(&mut lobby, v, "carol", "pw");
    lobby.handle_line(v, "JOIN:room1:VIEWER");

    assert_eq!(lobby.disconnect(v), vec![]);
    assert_eq!(
        lobby.handle_line(alice, "PLACE:0:0"),
        board_broadcast(&[alice, bob], "100000000")
    );
}

#[test]
fn creator_disconnect_closes_a_pending_room() {
    let mut lobby = lobby_with_users("penddrop", &[("alice", "pw"), ("carol", "pw")]);
    let a = connect(&mut lobby, 1);
    let v = connect(&mut lobby, 2);
    login(&mut lobby, a, "alice", "pw");
    login(&mut lobby, v, "carol", "pw");
    lobby.handle_line(a, "CREATE:room1");
    lobby.handle_line(v, "JOIN:room1:VIEWER");

    // No opponent exists yet, so nothing is forfeited or announced.
    assert_eq!(lobby.disconnect(a), vec![]);
    // The viewer was released and the name freed.
    assert_eq!(
        lobby.handle_line(v, "CREATE:room1"),
        vec![(v, ServerMessage::CreateAck(0))]
    );
}

// -----------------------------------------------------------------------------
// The spec walkthrough, end to end
// -----------------------------------------------------------------------------

#[test]
fn register_login_create_join_play() {
    let mut lobby = lobby_with_users("walkthrough", &[]);
    let a = connect(&mut lobby, 1);
    let b = connect(&mut lobby, 2);

    assert_eq!(
        lobby.handle_line(a, "REGISTER:alice:pw"),
        vec![(a, ServerMessage::RegisterAck(0))]
    );
    login(&mut lobby, a, "alice", "pw");
    assert_eq!(
        lobby.handle_line(a, "CREATE:room1"),
        vec![(a, ServerMessage::CreateAck(0))]
    );

    assert_eq!(
        lobby.handle_line(b, "REGISTER:bob:pw"),
        vec![(b, ServerMessage::RegisterAck(0))]
    );
    login(&mut lobby, b, "bob", "pw");
    let begin = ServerMessage::Begin {
        player1: "alice".into(),
        player2: "bob".into(),
    };
    assert_eq!(
        lobby.handle_line(b, "JOIN:room1:PLAYER"),
        vec![
            (a, begin.clone()),
            (b, begin),
            (b, ServerMessage::JoinAck(0)),
        ]
    );

    assert_eq!(
        lobby.handle_line(a, "PLACE:0:0"),
        board_broadcast(&[a, b], "100000000")
    );
    assert_eq!(
        lobby.handle_line(b, "PLACE:1:0"),
        board_broadcast(&[a, b], "120000000")
    );
}
