//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Listens on the configured port.
//! - Accepts new TCP connections and assigns each a `ClientId`.
//! - Spawns:
//!   - a per-client task for socket I/O,
//!   - a single central lobby task that owns all mutable state.
//!
//! The per-client logic and the lobby loop live in the `client` and
//! `lobby` modules respectively.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::auth::AuthStore;
use crate::client;
use crate::config::Config;
use crate::lobby::run_lobby_loop;
use crate::types::{ClientId, LobbyRequest, LobbyRx, LobbyTx, OutboundRx, OutboundTx};

/// Counter for assigning unique `ClientId`s over the process lifetime.
static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_client_id() -> ClientId {
    ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Bind the configured port and run the server forever.
pub async fn run(config: Config, auth: AuthStore) -> anyhow::Result<()> {
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");
    serve(listener, auth).await
}

/// Accept connections on an already-bound listener.
///
/// Split out from [`run`] so tests can bind an ephemeral port.
pub async fn serve(listener: TcpListener, auth: AuthStore) -> anyhow::Result<()> {
    let (lobby_tx, lobby_rx): (LobbyTx, LobbyRx) = mpsc::unbounded_channel();

    // The one task that owns the registry, auth store, and rooms.
    tokio::spawn(run_lobby_loop(lobby_rx, auth));

    loop {
        let (stream, peer_addr) = listener.accept().await.context("accepting connection")?;
        let client_id = next_client_id();

        let (out_tx, out_rx): (OutboundTx, OutboundRx) = mpsc::unbounded_channel();
        lobby_tx
            .send(LobbyRequest::Connected {
                client_id,
                peer_addr,
                out_tx,
            })
            .context("lobby task is gone")?;

        let lobby_tx = lobby_tx.clone();
        tokio::spawn(async move {
            match client::run_client(client_id, stream, lobby_tx, out_rx).await {
                Ok(()) => info!(client = client_id.0, "client disconnected"),
                Err(err) => warn!(client = client_id.0, error = %err, "client error"),
            }
        });
    }
}
