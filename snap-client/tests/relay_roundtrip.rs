//! End-to-end tests: SDK against an in-process relay.

use serde_json::{json, Value};
use blindsnap_client::{
    encrypt_snapshot, generate_identity, import_signing_keys, subscribe_ws, ClientError,
    CloseInfo, PostSnapshot, SignedEnvelopeRequest, SnapshotClient, SubscribeOptions,
    SubscriptionHandler, CLOSE_POLICY_VIOLATION,
};
use snap_relay::{build_router, Config, SnapshotRelay};
use snap_types::ServerMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

struct TestBroker {
    relay: Arc<SnapshotRelay>,
    http_url: String,
    ws_url: String,
}

async fn start_broker(api_key: Option<&str>) -> TestBroker {
    let mut config = Config::default();
    config.auth.api_key = api_key.map(String::from);
    let relay = Arc::new(SnapshotRelay::open(config).await.unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(relay.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestBroker {
        relay,
        http_url: format!("http://{addr}"),
        ws_url: format!("ws://{addr}/ws"),
    }
}

#[derive(Debug)]
enum Event {
    Open,
    Message(ServerMessage),
    Close(Option<CloseInfo>),
    Error(String),
}

/// Forwards callbacks into a channel the test can await.
struct Forward(mpsc::UnboundedSender<Event>);

impl SubscriptionHandler for Forward {
    fn on_open(&mut self) {
        let _ = self.0.send(Event::Open);
    }
    fn on_message(&mut self, message: ServerMessage) {
        let _ = self.0.send(Event::Message(message));
    }
    fn on_close(&mut self, close: Option<CloseInfo>) {
        let _ = self.0.send(Event::Close(close));
    }
    fn on_error(&mut self, error: ClientError) {
        let _ = self.0.send(Event::Error(error.to_string()));
    }
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("handler dropped")
}

async fn wait_for_subscribers(relay: &SnapshotRelay, room: &str, n: usize) {
    for _ in 0..100 {
        if relay.rooms().subscriber_count(room) == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("room {room} never reached {n} subscribers");
}

#[tokio::test]
async fn encrypted_post_reaches_room_subscriber() {
    let broker = start_broker(None).await;

    let (tx, mut events) = mpsc::unbounded_channel();
    let subscription = subscribe_ws(
        SubscribeOptions {
            ws_url: format!("{}?room=demo", broker.ws_url),
            token: None,
        },
        Forward(tx),
    )
    .await
    .unwrap();

    assert!(matches!(next_event(&mut events).await, Event::Open));
    match next_event(&mut events).await {
        Event::Message(ServerMessage::Welcome { room, .. }) => assert_eq!(room, "demo"),
        other => panic!("expected welcome, got {other:?}"),
    }
    wait_for_subscribers(&broker.relay, "demo", 1).await;

    let keys = import_signing_keys(&generate_identity()).unwrap();
    let payload = json!({"msg": "hello"});
    let client = SnapshotClient::new(&broker.http_url, None);
    let created = client
        .post_snapshot(PostSnapshot {
            project_id: "proj-1",
            kind: "snapshot",
            payload: &payload,
            signing_keys: Some(&keys),
            meta: json!({}),
            room: Some("demo"),
        })
        .await
        .unwrap();

    match next_event(&mut events).await {
        Event::Message(ServerMessage::Snapshot { record }) => {
            assert_eq!(record.id, created.id);
            assert_eq!(record.room, "demo");
            assert_eq!(record.meta, json!({}));
            assert!(record.ts > 0);
        }
        other => panic!("expected snapshot notification, got {other:?}"),
    }

    // The broker holds ciphertext only; the SDK can verify and open it
    let record = client.get_snapshot(&created.id).await.unwrap();
    assert!(!record.payload.contains("hello"));
    let request = SignedEnvelopeRequest::from_payload(&record.payload).unwrap();
    assert!(request.verify().unwrap());
    assert_eq!(request.open::<Value>().unwrap(), payload);

    subscription.unsubscribe().await;
    wait_for_subscribers(&broker.relay, "demo", 0).await;
}

#[tokio::test]
async fn no_callbacks_after_unsubscribe() {
    let broker = start_broker(None).await;
    let (tx, mut events) = mpsc::unbounded_channel();
    let subscription = subscribe_ws(
        SubscribeOptions {
            ws_url: format!("{}?room=demo", broker.ws_url),
            token: None,
        },
        Forward(tx),
    )
    .await
    .unwrap();

    next_event(&mut events).await; // open
    next_event(&mut events).await; // welcome
    wait_for_subscribers(&broker.relay, "demo", 1).await;

    subscription.unsubscribe().await;
    match next_event(&mut events).await {
        Event::Close(Some(info)) => assert_eq!(info.code, 1000),
        other => panic!("expected close, got {other:?}"),
    }
    wait_for_subscribers(&broker.relay, "demo", 0).await;

    let payload = json!({"msg": "late"});
    SnapshotClient::new(&broker.http_url, None)
        .post_snapshot(PostSnapshot {
            project_id: "proj-1",
            kind: "snapshot",
            payload: &payload,
            signing_keys: None,
            meta: json!({}),
            room: Some("demo"),
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // The handler is gone once unsubscribe returns
    match events.try_recv() {
        Ok(event) => panic!("callback after unsubscribe: {event:?}"),
        Err(e) => assert_eq!(e, mpsc::error::TryRecvError::Disconnected),
    }
}

#[tokio::test]
async fn ping_answered_with_pong() {
    let broker = start_broker(None).await;
    let (tx, mut events) = mpsc::unbounded_channel();
    let subscription = subscribe_ws(
        SubscribeOptions {
            ws_url: broker.ws_url.clone(),
            token: None,
        },
        Forward(tx),
    )
    .await
    .unwrap();

    next_event(&mut events).await; // open
    next_event(&mut events).await; // welcome
    subscription.ping().unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        Event::Message(ServerMessage::Pong { .. })
    ));
    subscription.unsubscribe().await;
}

#[tokio::test]
async fn direct_payload_roundtrips_exactly() {
    let broker = start_broker(None).await;
    let block = encrypt_snapshot(&json!({"n": 42}), &json!({"type": "snapshot"})).unwrap();
    let payload = serde_json::to_string(&block).unwrap();

    let http = reqwest::Client::new();
    let response: Value = http
        .post(format!("{}/snapshots", broker.http_url))
        .json(&json!({"room": "raw", "payload": payload}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = response["id"].as_str().unwrap().parse().unwrap();

    let record = SnapshotClient::new(&broker.http_url, None)
        .get_snapshot(&id)
        .await
        .unwrap();
    assert_eq!(record.payload, payload);
    assert_eq!(record.room, "raw");
}

#[tokio::test]
async fn missing_token_rejected_with_401() {
    let broker = start_broker(Some("secret")).await;
    let payload = json!({"msg": "hello"});
    let post = |token: Option<&str>| {
        let client = SnapshotClient::new(&broker.http_url, token.map(String::from));
        let payload = payload.clone();
        async move {
            client
                .post_snapshot(PostSnapshot {
                    project_id: "p",
                    kind: "snapshot",
                    payload: &payload,
                    signing_keys: None,
                    meta: json!({}),
                    room: None,
                })
                .await
        }
    };

    match post(None).await {
        Err(ClientError::Http { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("unauthorized"));
        }
        other => panic!("expected 401, got {other:?}"),
    }
    assert_eq!(broker.relay.snapshot_count().await.unwrap(), 0);

    assert!(post(Some("secret")).await.is_ok());
    assert_eq!(broker.relay.snapshot_count().await.unwrap(), 1);
}

#[tokio::test]
async fn wrong_token_subscription_closed_with_1008() {
    let broker = start_broker(Some("secret")).await;
    let (tx, mut events) = mpsc::unbounded_channel();
    let subscription = subscribe_ws(
        SubscribeOptions {
            ws_url: format!("{}?room=demo", broker.ws_url),
            token: Some("wrong".into()),
        },
        Forward(tx),
    )
    .await
    .unwrap();

    assert!(matches!(next_event(&mut events).await, Event::Open));
    match next_event(&mut events).await {
        Event::Close(Some(info)) => assert_eq!(info.code, CLOSE_POLICY_VIOLATION),
        other => panic!("expected policy close, got {other:?}"),
    }
    assert_eq!(broker.relay.rooms().subscriber_count("demo"), 0);
    subscription.unsubscribe().await;
}

#[tokio::test]
async fn health_and_rooms_via_sdk() {
    let broker = start_broker(None).await;
    let client = SnapshotClient::new(format!("{}/", broker.http_url), None);

    let health = client.health().await.unwrap();
    assert!(health.ok);
    assert_eq!(health.snapshots, 0);
    assert!(client.rooms().await.unwrap().rooms.is_empty());
}
