use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::state::AppState;
use crate::ws::protocol;

/// Ping interval: server sends a WebSocket ping every 30 seconds, bounding
/// how long a dead connection can keep its binding alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Pong timeout: if pong not received within 10 seconds after ping, close.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the actor-per-connection pattern for an authenticated WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader task: processes incoming events, dispatches to protocol handlers
///
/// The mpsc channel allows any part of the system (the relay in particular)
/// to push messages to this client by cloning the sender.
///
/// `identity` is the verified phone number from the connection's token
/// claims. The connection starts unregistered: it holds a ConnId and an
/// outbound queue but no binding until it sends a register event. Disconnect
/// from either state runs the same cleanup; the registry makes it a no-op
/// when there is nothing to remove.
pub async fn run_connection(socket: WebSocket, state: AppState, identity: String) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let conn = state.registry.subscribe(tx.clone());

    tracing::info!(identity = %identity, conn = %conn, "Connection actor started");

    // Spawn writer task: forwards mpsc messages to the WebSocket sink
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Track pong reception
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();

    // Spawn ping task: sends periodic pings and monitors pong responses
    let ping_tx = tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died — connection is gone
                break;
            }

            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {
                    // Pong received, continue
                }
                _ => {
                    tracing::warn!("Pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop: process incoming WebSocket messages in arrival order
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    protocol::handle_text_frame(&text, conn, &tx, &state, &identity);
                }
                Message::Binary(_) => {
                    tracing::debug!(
                        identity = %identity,
                        "Received binary frame (protocol is JSON text), dropping"
                    );
                }
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(
                        identity = %identity,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    identity = %identity,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                // Stream ended — client disconnected
                tracing::info!(identity = %identity, "WebSocket stream ended");
                break;
            }
        }
    }

    // Cleanup: abort writer and ping tasks, then release the binding.
    // No further events are processed for this ConnId.
    writer_handle.abort();
    ping_handle.abort();

    state.registry.unbind_conn(conn);

    tracing::info!(identity = %identity, conn = %conn, "Connection actor stopped");
}

/// Writer task: receives messages from the mpsc channel and forwards them
/// to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}
