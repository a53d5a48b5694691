//! Per-subscriber WebSocket sessions.
//!
//! A session authenticates the upgrade, joins one room, sends a welcome and
//! then only answers pings. Everything else a client sends is ignored.

use crate::rooms::Outbound;
use crate::server::SnapshotRelay;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::Query;
use axum::response::Response;
use axum::Extension;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use snap_types::{now_millis, ClientMessage, ServerMessage, DEFAULT_ROOM};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Query parameters of `GET /ws`.
#[derive(Debug, Default, Deserialize)]
pub struct SubscribeParams {
    /// Room to join (default: `global`).
    pub room: Option<String>,
    /// Shared API key.
    pub api_key: Option<String>,
}

impl SubscribeParams {
    fn room(&self) -> String {
        self.room
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ROOM)
            .to_string()
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<SubscribeParams>,
    Extension(relay): Extension<Arc<SnapshotRelay>>,
) -> Response {
    ws.on_upgrade(move |socket| run_session(relay, socket, params))
}

/// Run one subscriber session until the socket closes.
pub async fn run_session(relay: Arc<SnapshotRelay>, mut socket: WebSocket, params: SubscribeParams) {
    if relay.authorize(params.api_key.as_deref()).is_err() {
        let frame = CloseFrame {
            code: close_code::POLICY,
            reason: "unauthorized".into(),
        };
        if let Err(e) = socket.send(Message::Close(Some(frame))).await {
            tracing::debug!("Failed to send auth close: {}", e);
        }
        return;
    }

    let room = params.room();
    let buffer = relay.config().limits.subscriber_buffer.max(1);
    let (tx, rx) = mpsc::channel(buffer);

    // Queued before registering so the welcome precedes any broadcast
    let welcome = ServerMessage::Welcome {
        room: room.clone(),
        ts: now_millis(),
    };
    if !enqueue(&tx, &welcome) {
        let (sink, _) = socket.split();
        write_loop(sink, rx).await;
        return;
    }

    let id = relay.rooms().register(&room, tx.clone());
    relay
        .metrics()
        .subscribers_connected_total
        .fetch_add(1, Ordering::Relaxed);

    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(write_loop(sink, rx));

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if ClientMessage::parse(&text) == Some(ClientMessage::Ping) {
                    let pong = ServerMessage::Pong { ts: now_millis() };
                    if !enqueue(&tx, &pong) {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Subscriber {} read error: {}", id, e);
                break;
            }
        }
    }

    relay.rooms().unregister(&room, id);
    drop(tx);
    if let Err(e) = writer.await {
        tracing::error!("Subscriber {} writer task failed: {}", id, e);
    }
}

/// Queue a server message for the writer.
///
/// On serialization failure a 1011 close is queued instead and `false` is
/// returned; the session should end.
fn enqueue(tx: &mpsc::Sender<Outbound>, message: &ServerMessage) -> bool {
    match message.to_json() {
        Ok(text) => {
            if let Err(e) = tx.try_send(Outbound::Text(text)) {
                tracing::debug!("Subscriber queue rejected frame: {}", e);
            }
            true
        }
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            let _ = tx.try_send(Outbound::Close {
                code: close_code::ERROR,
                reason: "internal error".into(),
            });
            false
        }
    }
}

/// Drain the outbound queue into the socket until the queue closes, a
/// close frame is written, or the socket fails.
async fn write_loop(mut sink: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Outbound>) {
    while let Some(frame) = rx.recv().await {
        match frame {
            Outbound::Text(text) => {
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Outbound::Close { code, reason } => {
                let frame = CloseFrame {
                    code,
                    reason: reason.into(),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
                break;
            }
        }
    }
}
