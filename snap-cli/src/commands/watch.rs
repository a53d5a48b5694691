//! Stream room notifications until Ctrl-C.

use anyhow::{Context, Result};
use snap_client::{subscribe_ws, ClientError, CloseInfo, SubscribeOptions, SubscriptionHandler};
use snap_types::ServerMessage;
use tokio::sync::oneshot;

/// Prints each server frame as one JSON line.
struct LinePrinter {
    closed: Option<oneshot::Sender<Option<CloseInfo>>>,
}

impl SubscriptionHandler for LinePrinter {
    fn on_open(&mut self) {
        tracing::info!("Subscribed");
    }

    fn on_message(&mut self, message: ServerMessage) {
        match message.to_json() {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("Could not print frame: {}", e),
        }
    }

    fn on_close(&mut self, close: Option<CloseInfo>) {
        if let Some(tx) = self.closed.take() {
            let _ = tx.send(close);
        }
    }

    fn on_error(&mut self, error: ClientError) {
        eprintln!("error: {error}");
    }
}

/// Run the watch command.
pub async fn run(ws_url: &str, room: Option<&str>, token: Option<String>) -> Result<()> {
    let ws_url = with_room(ws_url, room);
    let (closed_tx, closed_rx) = oneshot::channel();

    let subscription = subscribe_ws(
        SubscribeOptions {
            ws_url: ws_url.clone(),
            token,
        },
        LinePrinter {
            closed: Some(closed_tx),
        },
    )
    .await
    .with_context(|| format!("Failed to subscribe to {ws_url}"))?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            subscription.unsubscribe().await;
            Ok(())
        }
        close = closed_rx => {
            subscription.unsubscribe().await;
            match close.ok().flatten() {
                Some(info) if info.code == snap_client::CLOSE_POLICY_VIOLATION => {
                    anyhow::bail!("Broker rejected the API key ({})", info.reason)
                }
                Some(info) => {
                    eprintln!("Connection closed by broker: {} {}", info.code, info.reason);
                    Ok(())
                }
                None => anyhow::bail!("Connection lost"),
            }
        }
    }
}

/// Append `room` as a query parameter if given.
fn with_room(ws_url: &str, room: Option<&str>) -> String {
    let Some(room) = room else {
        return ws_url.to_string();
    };
    let separator = if ws_url.contains('?') { '&' } else { '?' };
    format!("{ws_url}{separator}room={}", encode_component(room))
}

fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::spawn_relay;

    #[test]
    fn room_appended_to_url() {
        assert_eq!(with_room("ws://h/ws", None), "ws://h/ws");
        assert_eq!(with_room("ws://h/ws", Some("demo")), "ws://h/ws?room=demo");
        assert_eq!(
            with_room("ws://h/ws?x=1", Some("a b&c")),
            "ws://h/ws?x=1&room=a%20b%26c"
        );
    }

    #[tokio::test]
    async fn rejected_key_is_error() {
        let (_relay, url) = spawn_relay(Some("secret")).await;
        let ws_url = format!("{}/ws", url.replacen("http", "ws", 1));

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            run(&ws_url, Some("demo"), Some("wrong".into())),
        )
        .await
        .expect("watch should end when the broker closes");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("API key"));
    }
}
