//! Shared types for the lobby TCP server.
//!
//! This module defines:
//! - `ClientId`: a lightweight handle for connected clients
//! - channel aliases between client tasks and the lobby loop
//! - `LobbyRequest`: events flowing from client tasks to the lobby

use std::net::SocketAddr;

use tokio::sync::mpsc;

use ttt_core::ServerMessage;

/// Identifier for a connected client.
///
/// Intentionally opaque; unique over the lifetime of the process. All
/// lobby state is keyed by this id, never by the socket itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// Outbound messages from the lobby to a given client.
pub type OutboundTx = mpsc::UnboundedSender<ServerMessage>;
pub type OutboundRx = mpsc::UnboundedReceiver<ServerMessage>;

/// Event flowing from a client task into the central lobby task.
///
/// Per-connection ordering is preserved by the channel; ordering between
/// different connections is whatever the runtime delivers.
#[derive(Debug)]
pub enum LobbyRequest {
    /// A connection was accepted; `out_tx` is its outbound channel.
    Connected {
        client_id: ClientId,
        peer_addr: SocketAddr,
        out_tx: OutboundTx,
    },
    /// One complete decoded line from the connection.
    Line { client_id: ClientId, line: String },
    /// EOF or I/O error; the connection is gone.
    Disconnected { client_id: ClientId },
}

/// Channel from client tasks to the lobby task.
pub type LobbyTx = mpsc::UnboundedSender<LobbyRequest>;
pub type LobbyRx = mpsc::UnboundedReceiver<LobbyRequest>;
