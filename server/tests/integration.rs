//! Integration tests for the tabletop host.
//!
//! These tests start a real host instance and connect via WebSocket
//! to verify end-to-end behavior.

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tabletop_host::config::ServerConfig;
use tabletop_host::session_loop::{run_session_loop, HostBroadcast, HostCommand};
use tabletop_host::ws::AppState;
use tabletop_shared::color::Color;
use tabletop_shared::protocol::{ClientMsg, ServerMsg, SessionSnapshot, WelcomeMsg};
use tabletop_shared::seat::SeatRequest;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio_tungstenite::{connect_async, tungstenite::Message};

type Ws =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Start a test host on a random available port and return the WebSocket URL.
async fn start_test_server(max_connections: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = ServerConfig {
        listen_addr: addr.to_string(),
        max_connections,
        ..ServerConfig::default()
    };

    let (cmd_tx, cmd_rx) = mpsc::channel::<HostCommand>(config.command_queue_capacity);
    let (broadcast_tx, _) = broadcast::channel::<HostBroadcast>(config.broadcast_capacity);

    let app_state = AppState {
        cmd_tx,
        broadcast_tx: broadcast_tx.clone(),
        connection_semaphore: Arc::new(Semaphore::new(config.max_connections)),
    };

    tokio::spawn(async move {
        run_session_loop(cmd_rx, broadcast_tx, config).await;
    });

    let app = axum::Router::new()
        .route("/ws", axum::routing::get(tabletop_host::ws::ws_handler))
        .with_state(app_state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("ws://{}/ws", addr)
}

async fn connect(url: &str, name: &str) -> Ws {
    let (ws, _) = connect_async(format!("{}?name={}", url, name))
        .await
        .expect("Failed to connect");
    ws
}

/// Read the next text message and parse as ServerMsg.
async fn recv_msg(ws: &mut Ws) -> ServerMsg {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).expect("Failed to parse server message");
            }
            Some(Ok(_)) => continue, // Skip ping/pong
            Some(Err(e)) => panic!("WebSocket error: {}", e),
            None => panic!("WebSocket closed unexpectedly"),
        }
    }
}

async fn recv_msg_timeout(ws: &mut Ws, timeout: Duration) -> Option<ServerMsg> {
    tokio::time::timeout(timeout, recv_msg(ws)).await.ok()
}

async fn recv_welcome(ws: &mut Ws) -> WelcomeMsg {
    match recv_msg(ws).await {
        ServerMsg::Welcome(welcome) => welcome,
        other => panic!("Expected Welcome, got {:?}", other),
    }
}

/// Skip messages until a session state satisfies `pred`.
async fn wait_for_state(ws: &mut Ws, pred: impl Fn(&SessionSnapshot) -> bool) -> SessionSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match recv_msg_timeout(ws, remaining).await {
            Some(ServerMsg::SessionState(state)) if pred(&state) => return state,
            Some(_) => continue,
            None => panic!("Timed out waiting for matching session state"),
        }
    }
}

async fn send(ws: &mut Ws, msg: &ClientMsg) {
    let json = serde_json::to_string(msg).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

async fn request_seat(ws: &mut Ws, requested: SeatRequest) {
    send(
        ws,
        &ClientMsg::RequestSeat {
            current: None,
            requested,
        },
    )
    .await;
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_connect_and_receive_welcome() {
    let url = start_test_server(8).await;
    let mut ws = connect(&url, "ada").await;

    let welcome = recv_welcome(&mut ws).await;
    assert_eq!(welcome.protocol_version, 1);
    assert!(welcome.self_id > 0);
    assert!(welcome.is_host, "first participant hosts");
    assert_eq!(welcome.snapshot.seats.len(), 8);
    assert_eq!(welcome.snapshot.occupant_count, 0);
    assert!(welcome
        .snapshot
        .participants
        .iter()
        .any(|p| p.id == welcome.self_id && p.name == "ada"));
}

#[tokio::test]
async fn test_second_participant_is_not_host() {
    let url = start_test_server(8).await;
    let mut ws1 = connect(&url, "a").await;
    let w1 = recv_welcome(&mut ws1).await;
    let mut ws2 = connect(&url, "b").await;
    let w2 = recv_welcome(&mut ws2).await;

    assert_ne!(w1.self_id, w2.self_id);
    assert!(w1.is_host);
    assert!(!w2.is_host);
}

#[tokio::test]
async fn test_any_seat_fills_fixed_table_in_order() {
    let url = start_test_server(8).await;
    let mut a = connect(&url, "a").await;
    let ida = recv_welcome(&mut a).await.self_id;
    let mut b = connect(&url, "b").await;
    let idb = recv_welcome(&mut b).await.self_id;

    request_seat(&mut a, SeatRequest::Any).await;
    wait_for_state(&mut a, |s| s.seat_of(ida).is_some()).await;
    request_seat(&mut b, SeatRequest::Any).await;
    let state = wait_for_state(&mut a, |s| s.seat_of(idb).is_some()).await;

    assert_eq!(state.occupant(0), Some(ida));
    assert_eq!(state.occupant(1), Some(idb));
    assert_eq!(state.occupant_count, 2);
    assert_eq!(state.active_player, Some(0));
    assert_eq!(state.color_of(ida), Some(Color::BLUE));
    assert_eq!(state.color_of(idb), Some(Color::ORANGE));
}

#[tokio::test]
async fn test_taken_seat_is_rejected() {
    let url = start_test_server(8).await;
    let mut a = connect(&url, "a").await;
    let ida = recv_welcome(&mut a).await.self_id;
    let mut b = connect(&url, "b").await;
    let idb = recv_welcome(&mut b).await.self_id;

    request_seat(&mut a, SeatRequest::Physical { index: 2 }).await;
    wait_for_state(&mut b, |s| s.occupant(2) == Some(ida)).await;

    request_seat(&mut b, SeatRequest::Physical { index: 2 }).await;
    // A follow-up request proves the rejected one was processed first.
    request_seat(&mut b, SeatRequest::Physical { index: 3 }).await;
    let state = wait_for_state(&mut b, |s| s.seat_of(idb).is_some()).await;

    assert_eq!(state.occupant(2), Some(ida));
    assert_eq!(state.seat_of(idb), Some(3));
}

#[tokio::test]
async fn test_disconnect_vacates_seat_and_color() {
    let url = start_test_server(8).await;
    let mut a = connect(&url, "a").await;
    recv_welcome(&mut a).await;
    let mut b = connect(&url, "b").await;
    let idb = recv_welcome(&mut b).await.self_id;

    request_seat(&mut b, SeatRequest::Any).await;
    wait_for_state(&mut a, |s| s.seat_of(idb).is_some()).await;

    b.close(None).await.unwrap();
    let state = wait_for_state(&mut a, |s| s.participants.iter().all(|p| p.id != idb)).await;

    assert_eq!(state.seat_of(idb), None);
    assert_eq!(state.color_of(idb), None);
    assert_eq!(state.occupant_count, 0);
}

#[tokio::test]
async fn test_color_conflict_is_announced() {
    let url = start_test_server(8).await;
    let mut a = connect(&url, "a").await;
    let ida = recv_welcome(&mut a).await.self_id;
    let mut b = connect(&url, "b").await;
    let idb = recv_welcome(&mut b).await.self_id;

    let register = ClientMsg::RegisterColor {
        preferred: Color::RED,
        seat: None,
    };
    send(&mut a, &register).await;
    wait_for_state(&mut b, |s| s.color_of(ida).is_some()).await;
    send(&mut b, &register).await;

    let deadline = Duration::from_secs(2);
    loop {
        match recv_msg_timeout(&mut b, deadline).await {
            Some(ServerMsg::ColorConflict(msg)) => {
                assert_eq!(msg.participant, idb);
                assert_eq!(msg.requested, Color::RED);
                assert_ne!(msg.assigned, Color::RED);
                break;
            }
            Some(_) => continue,
            None => panic!("Expected a color conflict message"),
        }
    }
}

#[tokio::test]
async fn test_logical_request_maps_to_physical_seat() {
    let url = start_test_server(8).await;
    let mut a = connect(&url, "a").await;
    let ida = recv_welcome(&mut a).await.self_id;

    request_seat(&mut a, SeatRequest::Logical { index: 1 }).await;
    let state = wait_for_state(&mut a, |s| s.seat_of(ida).is_some()).await;
    assert_eq!(state.seat_of(ida), Some(3));
}

#[tokio::test]
async fn test_guest_cannot_change_palette() {
    let url = start_test_server(8).await;
    let mut host = connect(&url, "host").await;
    recv_welcome(&mut host).await;
    let mut guest = connect(&url, "guest").await;
    recv_welcome(&mut guest).await;

    send(
        &mut guest,
        &ClientMsg::SetPaletteColor {
            slot: 0,
            color: Color(0x101010),
        },
    )
    .await;
    send(
        &mut host,
        &ClientMsg::SetPaletteColor {
            slot: 1,
            color: Color(0x202020),
        },
    )
    .await;

    let state = wait_for_state(&mut guest, |s| s.palette[1] == Color(0x202020)).await;
    assert_eq!(state.palette[0], Color::BLUE);
}

#[tokio::test]
async fn test_connection_limit_refuses_extra_participant() {
    let url = start_test_server(1).await;
    let mut first = connect(&url, "first").await;
    recv_welcome(&mut first).await;

    let mut second = connect(&url, "second").await;
    let read = tokio::time::timeout(Duration::from_millis(300), async {
        while let Some(Ok(msg)) = second.next().await {
            if msg.is_text() {
                return true;
            }
        }
        false
    })
    .await;
    assert!(
        !matches!(read, Ok(true)),
        "extra participant should not be welcomed"
    );
}
