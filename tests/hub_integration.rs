//! Integration tests for the hub's WebSocket endpoint
//!
//! These tests spin up a real HTTP+WebSocket server and exercise the full
//! flow: admission → register → join/typing/signaling frames → fan-out to
//! the right connections → teardown cascade on disconnect.

use futures_util::{SinkExt, StreamExt};
use huddle::config::HubConfig;
use huddle::core::auth::StaticVerifier;
use huddle::hub::Hub;
use huddle::storage::{InMemoryNotificationStore, InMemoryPresenceStore, PresenceStatus};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;

type WsWrite = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;
type WsRead = futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

struct TestServer {
    addr: SocketAddr,
    hub: Arc<Hub>,
    alice: Uuid,
    bob: Uuid,
    notifications: InMemoryNotificationStore,
    presence: InMemoryPresenceStore,
}

/// Start a server on an ephemeral port with two known identities
async fn start_test_server() -> TestServer {
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let notifications = InMemoryNotificationStore::new();
    let presence = InMemoryPresenceStore::new();

    let hub = Hub::builder()
        .with_notification_store(notifications.clone())
        .with_presence_store(presence.clone())
        .build();

    let verifier = Arc::new(
        StaticVerifier::new()
            .with_token("alice-token", alice)
            .with_token("bob-token", bob),
    );

    let config = HubConfig::with_secret("unused-by-static-verifier");
    let app = huddle::server::build_router(&config, hub.clone(), verifier);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Small delay to let the server start
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        hub,
        alice,
        bob,
        notifications,
        presence,
    }
}

/// Connect with a token and return the welcome frame + stream halves
async fn ws_connect(addr: SocketAddr, token: &str) -> (Value, WsWrite, WsRead) {
    let url = format!("ws://{}/ws?token={}", addr, token);
    let (ws_stream, _) = connect_async(&url).await.expect("Failed to connect");
    let (write, mut read) = ws_stream.split();

    let welcome = ws_recv(&mut read).await;
    assert_eq!(welcome["type"], "connection_established");
    assert!(welcome["data"]["timestamp"].is_string());

    (welcome, write, read)
}

/// Send a JSON frame over WS
async fn ws_send(write: &mut WsWrite, frame: &Value) {
    let text = serde_json::to_string(frame).unwrap();
    write.send(Message::Text(text.into())).await.unwrap();
}

/// Receive the next JSON frame from WS (with timeout)
async fn ws_recv(read: &mut WsRead) -> Value {
    let msg = timeout(Duration::from_secs(2), read.next())
        .await
        .expect("Timeout waiting for WS frame")
        .expect("Stream ended")
        .expect("WS error");

    match msg {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("Expected text message, got {:?}", other),
    }
}

/// Assert that nothing arrives on this stream for a short window
async fn ws_expect_silence(read: &mut WsRead) {
    let result = timeout(Duration::from_millis(200), read.next()).await;
    assert!(result.is_err(), "Expected silence, got {:?}", result);
}

// === Admission ===

#[tokio::test]
async fn test_upgrade_without_token_is_refused() {
    let server = start_test_server().await;
    let url = format!("ws://{}/ws", server.addr);

    let err = connect_async(&url).await.unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status().as_u16(), 401);
        }
        other => panic!("Expected HTTP 401, got {:?}", other),
    }

    // No state was created for the refused handshake
    assert_eq!(server.hub.health_snapshot().await.total_connections, 0);
}

#[tokio::test]
async fn test_upgrade_with_unknown_token_is_refused() {
    let server = start_test_server().await;
    let url = format!("ws://{}/ws?token=somebody-else", server.addr);

    let err = connect_async(&url).await.unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status().as_u16(), 401);
        }
        other => panic!("Expected HTTP 401, got {:?}", other),
    }
}

// === Registration and backfill ===

#[tokio::test]
async fn test_connect_receives_welcome() {
    let server = start_test_server().await;
    let (welcome, _write, _read) = ws_connect(server.addr, "alice-token").await;

    assert_eq!(welcome["type"], "connection_established");
    assert!(server.hub.is_online(server.alice).await);
    assert_eq!(server.hub.connection_count(server.alice).await, 1);
}

#[tokio::test]
async fn test_pending_notifications_backfill_on_connect() {
    let server = start_test_server().await;
    server
        .notifications
        .push(server.alice, json!({"id": 1, "title": "Todo assigned"}))
        .unwrap();
    server
        .notifications
        .push(server.alice, json!({"id": 2, "title": "New reply"}))
        .unwrap();

    let (_welcome, _write, mut read) = ws_connect(server.addr, "alice-token").await;

    let pending = ws_recv(&mut read).await;
    assert_eq!(pending["type"], "pending_notifications");
    assert_eq!(pending["data"]["count"], 2);
    assert_eq!(
        pending["data"]["notifications"][0]["title"],
        "Todo assigned"
    );
}

#[tokio::test]
async fn test_no_backfill_frame_when_nothing_pending() {
    let server = start_test_server().await;
    let (_welcome, _write, mut read) = ws_connect(server.addr, "alice-token").await;

    ws_expect_silence(&mut read).await;
}

// === Frames ===

#[tokio::test]
async fn test_ping_pong() {
    let server = start_test_server().await;
    let (_welcome, mut write, mut read) = ws_connect(server.addr, "alice-token").await;

    ws_send(&mut write, &json!({"type": "ping"})).await;

    let pong = ws_recv(&mut read).await;
    assert_eq!(pong["type"], "pong");
}

#[tokio::test]
async fn test_join_confirm_and_membership_broadcast() {
    let server = start_test_server().await;
    let (_w, mut alice_write, mut alice_read) = ws_connect(server.addr, "alice-token").await;
    let (_w, mut bob_write, mut bob_read) = ws_connect(server.addr, "bob-token").await;

    ws_send(&mut alice_write, &json!({"type": "join_room", "room_id": "study-42"})).await;
    let joined = ws_recv(&mut alice_read).await;
    assert_eq!(joined["type"], "room_joined");
    assert_eq!(joined["data"]["room_id"], "study-42");

    ws_send(&mut bob_write, &json!({"type": "join_room", "room_id": "study-42"})).await;
    let peer_joined = ws_recv(&mut alice_read).await;
    assert_eq!(peer_joined["type"], "user_joined_room");
    assert_eq!(peer_joined["data"]["user_id"], server.bob.to_string());

    // Bob gets only his confirmation, not his own join broadcast
    let confirmed = ws_recv(&mut bob_read).await;
    assert_eq!(confirmed["type"], "room_joined");
    ws_expect_silence(&mut bob_read).await;
}

#[tokio::test]
async fn test_leave_broadcast_and_confirm() {
    let server = start_test_server().await;
    let (_w, mut alice_write, mut alice_read) = ws_connect(server.addr, "alice-token").await;
    let (_w, mut bob_write, mut bob_read) = ws_connect(server.addr, "bob-token").await;

    ws_send(&mut alice_write, &json!({"type": "join_room", "room_id": "r1"})).await;
    ws_send(&mut bob_write, &json!({"type": "join_room", "room_id": "r1"})).await;
    let _ = ws_recv(&mut alice_read).await; // room_joined
    let _ = ws_recv(&mut alice_read).await; // user_joined_room(bob)
    let _ = ws_recv(&mut bob_read).await; // room_joined

    ws_send(&mut bob_write, &json!({"type": "leave_room", "room_id": "r1"})).await;

    let left = ws_recv(&mut alice_read).await;
    assert_eq!(left["type"], "user_left_room");
    assert_eq!(left["data"]["user_id"], server.bob.to_string());

    let confirmed = ws_recv(&mut bob_read).await;
    assert_eq!(confirmed["type"], "room_left");

    assert_eq!(
        server.hub.room_participants("r1").await,
        vec![server.alice]
    );
}

#[tokio::test]
async fn test_signaling_relay_excludes_the_actor() {
    let server = start_test_server().await;
    let (_w, mut alice_write, mut alice_read) = ws_connect(server.addr, "alice-token").await;
    let (_w, mut bob_write, mut bob_read) = ws_connect(server.addr, "bob-token").await;

    ws_send(&mut alice_write, &json!({"type": "join_room", "room_id": "call-1"})).await;
    ws_send(&mut bob_write, &json!({"type": "join_room", "room_id": "call-1"})).await;
    let _ = ws_recv(&mut alice_read).await;
    let _ = ws_recv(&mut alice_read).await;
    let _ = ws_recv(&mut bob_read).await;

    ws_send(
        &mut alice_write,
        &json!({"type": "toggle_mute", "room_id": "call-1", "is_muted": true}),
    )
    .await;

    let toggled = ws_recv(&mut bob_read).await;
    assert_eq!(toggled["type"], "user_mute_toggled");
    assert_eq!(toggled["data"]["user_id"], server.alice.to_string());
    assert_eq!(toggled["data"]["is_muted"], true);

    ws_expect_silence(&mut alice_read).await;
}

#[tokio::test]
async fn test_focus_timer_reaches_the_whole_room() {
    let server = start_test_server().await;
    let (_w, mut alice_write, mut alice_read) = ws_connect(server.addr, "alice-token").await;
    let (_w, mut bob_write, mut bob_read) = ws_connect(server.addr, "bob-token").await;

    ws_send(&mut alice_write, &json!({"type": "join_room", "room_id": "focus-1"})).await;
    ws_send(&mut bob_write, &json!({"type": "join_room", "room_id": "focus-1"})).await;
    let _ = ws_recv(&mut alice_read).await;
    let _ = ws_recv(&mut alice_read).await;
    let _ = ws_recv(&mut bob_read).await;

    ws_send(
        &mut alice_write,
        &json!({"type": "focus_timer_start", "room_id": "focus-1", "timer_data": {"minutes": 25}}),
    )
    .await;

    // Timer frames are not exclusion-filtered: the originator hears them too
    let for_alice = ws_recv(&mut alice_read).await;
    let for_bob = ws_recv(&mut bob_read).await;
    assert_eq!(for_alice["type"], "focus_timer_started");
    assert_eq!(for_bob["type"], "focus_timer_started");
    assert_eq!(for_bob["data"]["timer_data"]["minutes"], 25);
}

#[tokio::test]
async fn test_unknown_frame_does_not_kill_the_connection() {
    let server = start_test_server().await;
    let (_welcome, mut write, mut read) = ws_connect(server.addr, "alice-token").await;

    ws_send(&mut write, &json!({"type": "self_destruct"})).await;
    ws_send(&mut write, &json!({"type": "join_room"})).await; // missing room_id

    // No error frame, no teardown; the connection keeps working
    ws_send(&mut write, &json!({"type": "ping"})).await;
    let pong = ws_recv(&mut read).await;
    assert_eq!(pong["type"], "pong");
}

#[tokio::test]
async fn test_room_frames_from_non_member_are_dropped() {
    let server = start_test_server().await;
    let (_w, mut alice_write, mut alice_read) = ws_connect(server.addr, "alice-token").await;
    let (_w, mut bob_write, mut bob_read) = ws_connect(server.addr, "bob-token").await;

    ws_send(&mut alice_write, &json!({"type": "join_room", "room_id": "r1"})).await;
    let _ = ws_recv(&mut alice_read).await;

    // Bob never joined r1
    ws_send(
        &mut bob_write,
        &json!({"type": "typing_start", "room_id": "r1", "user_name": "Bob"}),
    )
    .await;

    ws_expect_silence(&mut alice_read).await;

    // Bob's connection is still healthy
    ws_send(&mut bob_write, &json!({"type": "ping"})).await;
    let pong = ws_recv(&mut bob_read).await;
    assert_eq!(pong["type"], "pong");
}

// === The end-to-end presence scenario ===

#[tokio::test]
async fn test_typing_and_disconnect_scenario() {
    let server = start_test_server().await;

    // Identity A opens two connections, both join study-42
    let (_w, mut a1_write, mut a1_read) = ws_connect(server.addr, "alice-token").await;
    let (_w, _a2_write, mut a2_read) = ws_connect(server.addr, "alice-token").await;
    ws_send(&mut a1_write, &json!({"type": "join_room", "room_id": "study-42"})).await;
    // The confirmation goes to every connection of the identity
    let joined = ws_recv(&mut a1_read).await;
    assert_eq!(joined["type"], "room_joined");
    let joined = ws_recv(&mut a2_read).await;
    assert_eq!(joined["type"], "room_joined");

    // Identity B joins with a single connection
    let (_w, mut b_write, mut b_read) = ws_connect(server.addr, "bob-token").await;
    ws_send(&mut b_write, &json!({"type": "join_room", "room_id": "study-42"})).await;
    let _ = ws_recv(&mut b_read).await; // room_joined
    let _ = ws_recv(&mut a1_read).await; // user_joined_room(bob)
    let _ = ws_recv(&mut a2_read).await;

    // A starts typing: B sees exactly one indicator, A's connections none
    ws_send(
        &mut a1_write,
        &json!({"type": "typing_start", "room_id": "study-42", "user_name": "Alice"}),
    )
    .await;
    let typing = ws_recv(&mut b_read).await;
    assert_eq!(typing["type"], "user_typing");
    assert_eq!(typing["data"]["user_id"], server.alice.to_string());
    assert_eq!(typing["data"]["user_name"], "Alice");
    assert_eq!(typing["data"]["is_typing"], true);
    ws_expect_silence(&mut b_read).await;
    ws_expect_silence(&mut a1_read).await;
    ws_expect_silence(&mut a2_read).await;

    // A closes connection #1 only: no stop-typing, A is still online
    a1_write.close().await.unwrap();
    ws_expect_silence(&mut b_read).await;

    // A closes connection #2: B sees stop-typing and the offline signal
    drop(_a2_write);
    drop(a2_read);
    let stopped = ws_recv(&mut b_read).await;
    assert_eq!(stopped["type"], "user_typing");
    assert_eq!(stopped["data"]["is_typing"], false);
    let offline = ws_recv(&mut b_read).await;
    assert_eq!(offline["type"], "user_offline");
    assert_eq!(offline["data"]["user_id"], server.alice.to_string());
    assert_eq!(offline["data"]["room_id"], "study-42");

    // Disconnect is not a leave: A's membership survives
    let mut participants = server.hub.room_participants("study-42").await;
    participants.sort();
    let mut expected = vec![server.alice, server.bob];
    expected.sort();
    assert_eq!(participants, expected);
    assert!(!server.hub.is_online(server.alice).await);
}

// === Injected events ===

#[tokio::test]
async fn test_injected_notification_reaches_every_connection() {
    let server = start_test_server().await;
    let (_w, _w1, mut read1) = ws_connect(server.addr, "alice-token").await;
    let (_w, _w2, mut read2) = ws_connect(server.addr, "alice-token").await;

    server
        .hub
        .send_notification(server.alice, json!({"title": "Deploy finished"}))
        .await;

    for read in [&mut read1, &mut read2] {
        let frame = ws_recv(read).await;
        assert_eq!(frame["type"], "notification");
        assert_eq!(frame["data"]["title"], "Deploy finished");
    }
}

#[tokio::test]
async fn test_injected_room_event_respects_exclusion() {
    let server = start_test_server().await;
    let (_w, mut alice_write, mut alice_read) = ws_connect(server.addr, "alice-token").await;
    let (_w, mut bob_write, mut bob_read) = ws_connect(server.addr, "bob-token").await;
    ws_send(&mut alice_write, &json!({"type": "join_room", "room_id": "r1"})).await;
    ws_send(&mut bob_write, &json!({"type": "join_room", "room_id": "r1"})).await;
    let _ = ws_recv(&mut alice_read).await;
    let _ = ws_recv(&mut alice_read).await;
    let _ = ws_recv(&mut bob_read).await;

    server
        .hub
        .deliver_to_room(
            "r1",
            huddle::hub::protocol::ServerFrame::MessageReceived(json!({"id": 9})),
            Some(server.alice),
        )
        .await;

    let frame = ws_recv(&mut bob_read).await;
    assert_eq!(frame["type"], "message_received");
    ws_expect_silence(&mut alice_read).await;
}

// === Collaborator side effects ===

#[tokio::test]
async fn test_presence_store_sees_join_and_leave() {
    let server = start_test_server().await;
    let (_w, mut write, mut read) = ws_connect(server.addr, "alice-token").await;

    ws_send(&mut write, &json!({"type": "join_room", "room_id": "r1"})).await;
    let _ = ws_recv(&mut read).await;
    wait_for_presence(&server.presence, server.alice, "r1", PresenceStatus::Online).await;

    ws_send(&mut write, &json!({"type": "leave_room", "room_id": "r1"})).await;
    let _ = ws_recv(&mut read).await;
    wait_for_presence(&server.presence, server.alice, "r1", PresenceStatus::Offline).await;
}

async fn wait_for_presence(
    store: &InMemoryPresenceStore,
    user: Uuid,
    room: &str,
    expected: PresenceStatus,
) {
    for _ in 0..100 {
        if store.status_of(user, room).unwrap() == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("presence status never became {:?}", expected);
}
