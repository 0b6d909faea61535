//! WebSocket connection lifecycle, from upgrade through disconnect.

use std::{sync::Arc, time::Duration};

use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::{ClientConnection, ServerEvent, SharedState};

/// How long the writer gets to flush queued frames after a close.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Run one client connection.
///
/// 1. Registers the outbound queue and reports `ConnectionAccepted`
/// 2. Feeds every text frame to the driver as `MessageReceived`
/// 3. Forwards queued frames and sends periodic pings from a writer task
/// 4. Reports `ConnectionClosed` exactly once, whoever closed first
pub(crate) async fn run_connection(socket: WebSocket, state: Arc<SharedState>) {
    let connection_id = state.next_connection_id();
    let (ws_tx, mut ws_rx) = socket.split();

    let (send_tx, send_rx) = mpsc::channel::<Arc<str>>(state.config.outbound_buffer);
    let connection = Arc::new(ClientConnection::new(connection_id, send_tx));

    state.connections.write().await.insert(connection_id, Arc::clone(&connection));
    tracing::debug!(connection_id, "client connected");
    state.dispatch(ServerEvent::ConnectionAccepted { connection_id }).await;

    let mut outbound = tokio::spawn(write_loop(
        ws_tx,
        send_rx,
        Arc::clone(&connection),
        state.config.ping_interval,
        state.config.pong_timeout,
    ));

    let reason = loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            () = connection.closed() => break "closed by server",
        };

        let frame = match frame {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                tracing::debug!(connection_id, "read error: {}", e);
                break "read error";
            },
            None => break "peer disconnected",
        };

        connection.mark_alive();
        let text = match frame {
            Message::Text(text) => text.to_string(),
            Message::Binary(data) => String::from_utf8_lossy(&data).into_owned(),
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(_) => break "client sent close frame",
        };

        state.dispatch(ServerEvent::MessageReceived { connection_id, text }).await;
    };

    connection.close();
    if tokio::time::timeout(DRAIN_TIMEOUT, &mut outbound).await.is_err() {
        outbound.abort();
    }

    state.connections.write().await.remove(&connection_id);
    state
        .dispatch(ServerEvent::ConnectionClosed { connection_id, reason: reason.to_string() })
        .await;
    tracing::debug!(
        connection_id,
        dropped = connection.drop_count(),
        "client disconnected: {}",
        reason
    );
}

/// Forward queued frames to the socket and keep the connection alive.
///
/// Exits when the socket fails, the client misses pings for longer than
/// `pong_timeout`, or the connection is closed. On close, frames already
/// queued are flushed before the close frame.
async fn write_loop<S>(
    mut ws_tx: S,
    mut send_rx: mpsc::Receiver<Arc<str>>,
    connection: Arc<ClientConnection>,
    ping_interval: Duration,
    pong_timeout: Duration,
) where
    S: Sink<Message> + Unpin,
{
    let max_missed = (pong_timeout.as_millis() / ping_interval.as_millis().max(1)).max(1);
    let mut missed = 0u128;
    let mut ticker = tokio::time::interval(ping_interval);
    // Skip the immediate first tick
    ticker.tick().await;

    loop {
        tokio::select! {
            queued = send_rx.recv() => {
                let Some(text) = queued else { break };
                if ws_tx.send(Message::Text(text.to_string().into())).await.is_err() {
                    break;
                }
            },
            _ = ticker.tick() => {
                if connection.check_alive() {
                    missed = 0;
                } else {
                    missed += 1;
                    if missed >= max_missed {
                        tracing::warn!(
                            connection_id = connection.id,
                            "client unresponsive for {:?}, disconnecting",
                            pong_timeout
                        );
                        break;
                    }
                }
                if ws_tx.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            },
            () = connection.closed() => {
                while let Ok(text) = send_rx.try_recv() {
                    if ws_tx.send(Message::Text(text.to_string().into())).await.is_err() {
                        break;
                    }
                }
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            },
        }
    }

    connection.close();
}
