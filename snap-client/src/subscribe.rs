//! WebSocket subscription to a broker room.
//!
//! [`subscribe_ws`] connects, then hands every server frame to a
//! [`SubscriptionHandler`] from a background task. The returned
//! [`Subscription`] is the only way to stop it.
//!
//! # Design
//!
//! ```text
//! Subscription ──commands──► reader task ──callbacks──► handler
//!                                 ▲
//!                     broker frames (welcome/snapshot/pong)
//! ```

use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use snap_types::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::client::ClientError;

/// Close code sent by the broker on API key mismatch.
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Close code sent by the broker on an internal failure.
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Arguments for [`subscribe_ws`].
#[derive(Debug, Clone)]
pub struct SubscribeOptions {
    /// WebSocket URL, e.g. `ws://host:8787/ws?room=demo`.
    pub ws_url: String,
    /// API key, appended as the `api_key` query parameter.
    pub token: Option<String>,
}

/// Close frame details reported to [`SubscriptionHandler::on_close`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// WebSocket close code.
    pub code: u16,
    /// Close reason text.
    pub reason: String,
}

impl From<CloseFrame<'_>> for CloseInfo {
    fn from(frame: CloseFrame<'_>) -> Self {
        Self {
            code: u16::from(frame.code),
            reason: frame.reason.into_owned(),
        }
    }
}

/// Callbacks for subscription events. All methods default to no-ops.
///
/// Called from the subscription's background task, one at a time.
pub trait SubscriptionHandler: Send + 'static {
    /// Connection established.
    fn on_open(&mut self) {}

    /// A server frame arrived.
    fn on_message(&mut self, _message: ServerMessage) {}

    /// Connection closed, with the close frame if one was exchanged.
    fn on_close(&mut self, _close: Option<CloseInfo>) {}

    /// A frame could not be decoded or the socket failed.
    fn on_error(&mut self, _error: ClientError) {}
}

#[derive(Debug)]
enum Command {
    Ping,
    Close,
}

/// Handle to a running subscription.
#[derive(Debug)]
pub struct Subscription {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Send a liveness ping; the broker answers with a pong frame.
    pub fn ping(&self) -> Result<(), ClientError> {
        self.commands
            .send(Command::Ping)
            .map_err(|_| ClientError::Closed)
    }

    /// Whether the background task has finished.
    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }

    /// Close the socket and wait for the background task to finish.
    ///
    /// No handler callbacks fire after this returns.
    pub async fn unsubscribe(self) {
        // The task may already be gone if the broker closed first.
        let _ = self.commands.send(Command::Close);
        if let Err(e) = self.task.await {
            tracing::debug!("Subscription task ended abnormally: {}", e);
        }
    }
}

/// Connect to a broker room and deliver frames to `handler`.
///
/// The token, if any, is appended as `api_key`. A rejected key shows up as
/// [`SubscriptionHandler::on_close`] with code [`CLOSE_POLICY_VIOLATION`].
/// No connect timeout is applied; wrap the call in `tokio::time::timeout`
/// if one is needed.
pub async fn subscribe_ws<H: SubscriptionHandler>(
    opts: SubscribeOptions,
    mut handler: H,
) -> Result<Subscription, ClientError> {
    let mut url = Url::parse(&opts.ws_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
    if let Some(token) = &opts.token {
        url.query_pairs_mut().append_pair("api_key", token);
    }

    let (mut ws, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| ClientError::WebSocket(e.to_string()))?;
    tracing::debug!("Subscribed to {}", opts.ws_url);
    handler.on_open();

    let (commands, mut command_rx) = mpsc::unbounded_channel();
    let ping = ClientMessage::Ping
        .to_json()
        .map_err(|e| ClientError::Decode(e.to_string()))?;

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(Command::Ping) => {
                        if let Err(e) = ws.send(Message::Text(ping.clone())).await {
                            handler.on_error(ClientError::WebSocket(e.to_string()));
                        }
                    }
                    Some(Command::Close) | None => {
                        let frame = CloseFrame {
                            code: CloseCode::Normal,
                            reason: "unsubscribe".into(),
                        };
                        if let Err(e) = ws.close(Some(frame.clone())).await {
                            tracing::debug!("Close handshake failed: {}", e);
                        }
                        handler.on_close(Some(CloseInfo::from(frame)));
                        break;
                    }
                },
                frame = ws.next() => match frame {
                    Some(Ok(Message::Text(text))) => match ServerMessage::from_json(&text) {
                        Ok(message) => handler.on_message(message),
                        Err(e) => handler.on_error(ClientError::Decode(e.to_string())),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        handler.on_close(frame.map(CloseInfo::from));
                        break;
                    }
                    // Control frames are answered by tungstenite; binary is not part of the protocol
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        handler.on_error(ClientError::WebSocket(e.to_string()));
                        handler.on_close(None);
                        break;
                    }
                    None => {
                        handler.on_close(None);
                        break;
                    }
                },
            }
        }
    });

    Ok(Subscription { commands, task })
}
