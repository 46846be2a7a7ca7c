//! End-to-end flow over real WebSocket connections.

#![allow(clippy::unwrap_used)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    futures::{SinkExt, StreamExt},
    lansite_config::LansiteConfig,
    lansite_gateway::{
        GatewayState, build_gateway_app,
        auth::{ExternalIdentity, complete_login},
    },
    serde_json::{Value, json},
    tokio::net::TcpListener,
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
};

type Ws = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn start(config: LansiteConfig) -> (SocketAddr, Arc<GatewayState>) {
    let state = GatewayState::new(config);
    let app = build_gateway_app(Arc::clone(&state));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    (addr, state)
}

async fn connect(addr: SocketAddr) -> Ws {
    let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    ws
}

async fn send(ws: &mut Ws, frame: Value) {
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

/// Read frames until one with `event` arrives.
async fn expect(ws: &mut Ws, event: &str) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let msg = ws.next().await.unwrap().unwrap();
            if let Message::Text(text) = msg {
                let frame: Value = serde_json::from_str(text.as_str()).unwrap();
                if frame["event"] == event {
                    return frame;
                }
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {event}"))
}

async fn sign_in(state: &GatewayState, name: &str) -> (u64, String) {
    let creds = complete_login(state, ExternalIdentity {
        display_name: name.into(),
        profile: None,
    })
    .await;
    (creds.id, creds.secret)
}

#[tokio::test]
async fn request_approval_round_trip() {
    let (addr, state) = start(LansiteConfig::default()).await;
    let (admin_id, admin_secret) = sign_in(&state, "admin").await;
    let (user_id, user_secret) = sign_in(&state, "kacza").await;
    state
        .stream
        .lock()
        .await
        .sessions_mut()
        .set_privileged(admin_id, true)
        .unwrap();

    let mut admin = connect(addr).await;
    send(&mut admin, json!({
        "method": "session.adminLogin",
        "params": { "id": admin_id, "secret": admin_secret },
    }))
    .await;
    let snapshot = expect(&mut admin, "stream.snapshot").await;
    assert_eq!(snapshot["payload"].as_array().unwrap().len(), 1);

    let mut user = connect(addr).await;
    send(&mut user, json!({
        "method": "session.login",
        "params": { "id": user_id, "secret": user_secret },
    }))
    .await;
    expect(&mut user, "stream.snapshot").await;
    let roster = expect(&mut user, "roster.updated").await;
    assert!(
        roster["payload"]
            .as_array()
            .unwrap()
            .iter()
            .all(|p| p.get("secret").is_none())
    );

    send(&mut user, json!({
        "method": "event.create",
        "params": { "title": "Movie Night", "capacity": 5 },
    }))
    .await;
    let request = expect(&mut admin, "box.created").await;
    assert_eq!(request["payload"]["kind"], "request");
    assert_eq!(
        request["payload"]["text"],
        "kacza wants to create an event: Movie Night"
    );
    let unique = request["payload"]["unique"].as_str().unwrap().to_string();

    send(&mut admin, json!({
        "method": "request.resolve",
        "params": { "unique": unique, "accepted": true },
    }))
    .await;

    let event = expect(&mut user, "box.created").await;
    assert_eq!(event["payload"]["kind"], "event");
    assert_eq!(event["payload"]["title"], "Movie Night");
    assert_eq!(event["payload"]["members"][0]["id"], user_id);
    let accepted = expect(&mut user, "request.accepted").await;
    assert_eq!(
        accepted["payload"],
        "kacza wants to create an event: Movie Night"
    );

    let resync = expect(&mut admin, "stream.snapshot").await;
    assert_eq!(resync["payload"].as_array().unwrap().len(), 1);

    let event_unique = event["payload"]["unique"].as_str().unwrap().to_string();
    send(&mut user, json!({
        "method": "event.leave",
        "params": { "eventUnique": event_unique },
    }))
    .await;
    let updated = expect(&mut user, "box.updated").await;
    assert!(updated["payload"]["members"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn wrong_secret_is_told_auth_failed() {
    let (addr, state) = start(LansiteConfig::default()).await;
    let (id, _) = sign_in(&state, "kacza").await;

    let mut ws = connect(addr).await;
    send(&mut ws, json!({
        "method": "session.login",
        "params": { "id": id, "secret": "not-it" },
    }))
    .await;
    let failed = expect(&mut ws, "auth.failed").await;
    assert!(failed["payload"]["reason"].is_string());
}

#[tokio::test]
async fn garbage_frame_gets_invalid_request() {
    let (addr, _state) = start(LansiteConfig::default()).await;
    let mut ws = connect(addr).await;
    send(&mut ws, json!({ "method": "nope" })).await;
    let err = expect(&mut ws, "error").await;
    assert_eq!(err["payload"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn closing_the_socket_marks_identity_offline() {
    let (addr, state) = start(LansiteConfig::default()).await;
    let (id, secret) = sign_in(&state, "kacza").await;

    let mut ws = connect(addr).await;
    send(&mut ws, json!({
        "method": "session.login",
        "params": { "id": id, "secret": secret },
    }))
    .await;
    expect(&mut ws, "stream.snapshot").await;
    assert!(state.stream.lock().await.sessions().is_online(id));

    ws.close(None).await.unwrap();
    for _ in 0..50 {
        if !state.stream.lock().await.sessions().is_online(id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("identity still online after close");
}
