//! Per-connection I/O.
//!
//! Each accepted socket gets one reader loop (this function) and one
//! writer task. The reader feeds raw bytes into a [`LineBuffer`] and
//! forwards every complete line to the lobby; the writer drains the
//! connection's outbound channel. Neither touches lobby state.

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use ttt_protocol::{format_line, LineBuffer};

use crate::types::{ClientId, LobbyRequest, LobbyTx, OutboundRx};

/// Run the client I/O loop for a single connection.
///
/// Returns when the peer closes or errors; the lobby learns about it via
/// a `Disconnected` event either way.
pub async fn run_client(
    client_id: ClientId,
    stream: TcpStream,
    lobby_tx: LobbyTx,
    mut out_rx: OutboundRx,
) -> Result<()> {
    let (mut read_stream, write_stream) = stream.into_split();

    // Writer task: drain outbound messages onto the socket. Ends when the
    // lobby drops our sender (i.e. after our Disconnected event).
    let _writer_handle = tokio::spawn(async move {
        let mut write_stream = write_stream;
        while let Some(msg) = out_rx.recv().await {
            let line = format!("{}\n", format_line(&msg));
            if let Err(err) = write_stream.write_all(line.as_bytes()).await {
                debug!(client = client_id.0, error = %err, "write failed");
                break;
            }
            if write_stream.flush().await.is_err() {
                break;
            }
        }
    });

    let mut lines = LineBuffer::new();
    let mut read_buf = [0u8; 1024];
    let result = loop {
        match read_stream.read(&mut read_buf).await {
            // EOF: peer closed cleanly.
            Ok(0) => break Ok(()),
            Ok(n) => {
                lines.extend(&read_buf[..n]);
                while let Some(line) = lines.next_line() {
                    trace!(client = client_id.0, line, "line in");
                    if lobby_tx
                        .send(LobbyRequest::Line {
                            client_id,
                            line,
                        })
                        .is_err()
                    {
                        // Lobby gone; nothing left to do for this client.
                        return Ok(());
                    }
                }
            }
            Err(err) => break Err(err.into()),
        }
    };

    let _ = lobby_tx.send(LobbyRequest::Disconnected { client_id });
    result
}
