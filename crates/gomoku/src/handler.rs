//! Per-connection pump pair.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`], which spawns a writer and runs the reader inline:
//!
//! ```text
//!   socket ──recv──→ reader ──dispatch──→ registry ──→ rooms
//!   socket ←─send─── writer ←──outbox───── registry / rooms
//! ```
//!
//! Either side stopping closes the outbox, which stops the other, even
//! when the writer is parked on a socket the peer has stopped reading.

use std::sync::Arc;
use std::time::Duration;

use gomoku_protocol::{ClientMessage, Codec};
use gomoku_room::{Outbox, OutboxReceiver, outbox};
use gomoku_transport::{Connection, WebSocketConnection};

use crate::GomokuError;
use crate::server::ServerState;

/// How long teardown waits for the close frame to flush.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), GomokuError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, peer = %conn.peer_addr(), "client connected");

    let (outbox, receiver) = outbox(conn_id, state.outbound_capacity);
    state.registry.connect(outbox.clone())?;

    let writer = tokio::spawn(write_pump(
        Arc::clone(&conn),
        Arc::clone(&state),
        receiver,
        outbox.clone(),
    ));

    let result = read_pump(&conn, &state, &outbox).await;

    outbox.close();
    if let Err(e) = state.registry.disconnect(conn_id) {
        tracing::debug!(%conn_id, error = %e, "registry gone before disconnect");
    }
    let _ = writer.await;
    if tokio::time::timeout(CLOSE_TIMEOUT, conn.close()).await.is_err() {
        tracing::debug!(%conn_id, "close frame not flushed, dropping socket");
    }
    tracing::info!(%conn_id, "client disconnected");

    result
}

/// Receives frames until EOF, a read error, or the outbox closing.
///
/// Malformed frames are logged and skipped without a reply.
async fn read_pump<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    outbox: &Outbox,
) -> Result<(), GomokuError> {
    let conn_id = conn.id();

    loop {
        let data = tokio::select! {
            () = outbox.closed() => {
                tracing::debug!(%conn_id, "outbox closed, stopping reader");
                return Ok(());
            }
            received = conn.recv() => match received {
                Ok(Some(data)) => data,
                Ok(None) => {
                    tracing::debug!(%conn_id, "connection closed cleanly");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            },
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "ignoring malformed frame");
                continue;
            }
        };

        tracing::debug!(%conn_id, ?msg, "client message");
        state.registry.dispatch(conn_id, msg)?;
    }
}

/// Drains the outbox onto the socket.
///
/// Stops on the first failed write, or as soon as the outbox closes, even
/// mid-write.
async fn write_pump<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut receiver: OutboxReceiver,
    outbox: Outbox,
) {
    let conn_id = conn.id();

    while let Some(msg) = receiver.recv().await {
        let frame = match state.codec.encode(&msg) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(%conn_id, error = %e, "failed to encode server message");
                continue;
            }
        };
        tokio::select! {
            biased;
            () = outbox.closed() => {
                tracing::debug!(%conn_id, "outbox closed mid-write, stopping writer");
                break;
            }
            sent = conn.send(&frame) => {
                if let Err(e) = sent {
                    tracing::debug!(%conn_id, error = %e, "write failed, stopping writer");
                    break;
                }
            }
        }
    }

    outbox.close();
}
