//! End-to-end tests: a real server on a random port, driven by real
//! WebSocket clients speaking the JSON protocol.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gamehall::prelude::*;
use gamehall_room::RoomRegistry;
use serde_json::{Value, json};
use tokio::time::{self, Instant};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

const WAIT: Duration = Duration::from_secs(5);

/// Two rooms, the reference engine, no periodic room lists.
fn base() -> GameHallServerBuilder {
    GameHallServer::builder()
        .bind("127.0.0.1:0")
        .rooms(["R1", "R2"])
        .room_list_interval(Duration::ZERO)
        .engine::<TicTacToe>()
}

/// Starts a server and returns its address and rooms.
async fn start(builder: GameHallServerBuilder) -> (String, RoomRegistry) {
    let server = builder.build().await.expect("server should build");
    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let rooms = server.rooms().clone();

    tokio::spawn(async move {
        let _ = server.run().await;
    });
    (addr, rooms)
}

/// Next JSON frame, or `None` if nothing arrives within `wait`.
async fn next_frame(ws: &mut ClientWs, wait: Duration) -> Option<Value> {
    let deadline = Instant::now() + wait;
    loop {
        let msg = match time::timeout_at(deadline, ws.next()).await {
            Err(_) => return None,
            Ok(msg) => msg.expect("stream ended").expect("websocket error"),
        };
        // Pings are answered by tungstenite while we read.
        if let Message::Text(text) = msg {
            return Some(serde_json::from_str(text.as_str()).expect("frame should be JSON"));
        }
    }
}

/// Next frame that isn't a periodic `roomsList`.
async fn recv_within(ws: &mut ClientWs, wait: Duration) -> Option<Value> {
    let deadline = Instant::now() + wait;
    loop {
        let frame = next_frame(ws, deadline.saturating_duration_since(Instant::now())).await?;
        if frame["type"] != "roomsList" {
            return Some(frame);
        }
    }
}

async fn recv(ws: &mut ClientWs) -> Value {
    recv_within(ws, WAIT).await.expect("timed out waiting for a frame")
}

async fn send(ws: &mut ClientWs, frame: Value) {
    ws.send(Message::text(frame.to_string()))
        .await
        .expect("send should succeed");
}

/// Connects and consumes `connected` + `roomsList`. Returns the client id.
async fn connect(addr: &str) -> (ClientWs, String) {
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    let connected = next_frame(&mut ws, WAIT).await.expect("connected frame");
    assert_eq!(connected["type"], "connected");
    let id = connected["clientId"].as_str().expect("clientId").to_string();

    let rooms = next_frame(&mut ws, WAIT).await.expect("roomsList frame");
    assert_eq!(rooms["type"], "roomsList");
    (ws, id)
}

/// Joins `room` and returns the `joinedRoom` frame.
async fn join(ws: &mut ClientWs, room: &str, name: &str) -> Value {
    send(ws, json!({"type": "joinRoom", "roomName": room, "clientName": name})).await;
    let joined = recv(ws).await;
    assert_eq!(joined["type"], "joinedRoom", "got {joined}");
    joined
}

async fn game_action(ws: &mut ClientWs, action: Value) {
    send(ws, json!({"type": "gameAction", "gameType": "tictactoe", "action": action})).await;
}

/// A and B connected, both in R1, join traffic drained.
async fn pair_in_r1(addr: &str) -> ((ClientWs, String), (ClientWs, String)) {
    let (mut a, a_id) = connect(addr).await;
    let (mut b, b_id) = connect(addr).await;
    join(&mut a, "R1", "ann").await;
    join(&mut b, "R1", "bob").await;
    let new_client = recv(&mut a).await;
    assert_eq!(new_client, json!({"type": "newClient", "clientId": b_id}));
    ((a, a_id), (b, b_id))
}

fn assert_error(frame: &Value) {
    assert_eq!(frame["type"], "error", "expected error, got {frame}");
    assert!(frame["message"].as_str().is_some_and(|m| !m.is_empty()));
}

// =========================================================================
// Connection and rooms
// =========================================================================

#[tokio::test]
async fn test_connect_sends_identity_then_room_list() {
    let (addr, _) = start(base()).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .unwrap();

    let connected = next_frame(&mut ws, WAIT).await.unwrap();
    assert_eq!(connected["type"], "connected");
    assert_eq!(connected["clientId"].as_str().unwrap().len(), 32);

    let rooms = next_frame(&mut ws, WAIT).await.unwrap();
    assert_eq!(
        rooms,
        json!({
            "type": "roomsList",
            "rooms": [{"name": "R1", "clients": []}, {"name": "R2", "clients": []}]
        })
    );
}

#[tokio::test]
async fn test_each_connection_gets_a_distinct_id() {
    let (addr, _) = start(base()).await;
    let (_a, a_id) = connect(&addr).await;
    let (_b, b_id) = connect(&addr).await;
    assert_ne!(a_id, b_id);
}

#[tokio::test]
async fn test_join_reports_membership() {
    let (addr, _) = start(base()).await;
    let (mut a, a_id) = connect(&addr).await;
    let (mut b, b_id) = connect(&addr).await;

    let joined = join(&mut a, "R1", "ann").await;
    assert_eq!(
        joined,
        json!({"type": "joinedRoom", "room": "R1", "clients": [{"id": a_id, "name": "ann"}]})
    );

    // No clientName: a guest label derived from the id.
    send(&mut b, json!({"type": "joinRoom", "roomName": "R1"})).await;
    let joined = recv(&mut b).await;
    assert_eq!(joined["clients"][1]["id"], b_id.as_str());
    assert_eq!(joined["clients"][1]["name"], format!("Guest-{}", &b_id[..6]));

    assert_eq!(recv(&mut a).await, json!({"type": "newClient", "clientId": b_id}));
}

#[tokio::test]
async fn test_list_rooms_on_demand() {
    let (addr, _) = start(base()).await;
    let ((mut a, a_id), (_b, b_id)) = pair_in_r1(&addr).await;

    send(&mut a, json!({"type": "listRooms"})).await;
    let rooms = next_frame(&mut a, WAIT).await.unwrap();
    assert_eq!(
        rooms,
        json!({
            "type": "roomsList",
            "rooms": [
                {"name": "R1", "clients": [{"id": a_id, "name": "ann"}, {"id": b_id, "name": "bob"}]},
                {"name": "R2", "clients": []}
            ]
        })
    );
}

#[tokio::test]
async fn test_room_list_broadcast_periodically() {
    let (addr, _) = start(base().room_list_interval(Duration::from_millis(50))).await;
    let (mut a, _) = connect(&addr).await;

    for _ in 0..2 {
        let frame = next_frame(&mut a, WAIT).await.unwrap();
        assert_eq!(frame["type"], "roomsList");
    }
}

#[tokio::test]
async fn test_message_relayed_to_others_only() {
    let (addr, _) = start(base()).await;
    let ((mut a, a_id), (mut b, _)) = pair_in_r1(&addr).await;
    let (mut c, _) = connect(&addr).await;
    join(&mut c, "R2", "cy").await;

    let message = json!({"event": "chat", "payload": {"text": "hi"}});
    send(&mut a, json!({"type": "message", "message": message})).await;

    assert_eq!(
        recv(&mut b).await,
        json!({"type": "message", "clientId": a_id, "message": message})
    );
    assert!(recv_within(&mut a, Duration::from_millis(200)).await.is_none());
    assert!(recv_within(&mut c, Duration::from_millis(50)).await.is_none());
}

#[tokio::test]
async fn test_joining_another_room_leaves_the_first() {
    let (addr, _) = start(base()).await;
    let ((mut a, a_id), (mut b, _)) = pair_in_r1(&addr).await;

    let joined = join(&mut a, "R2", "ann").await;
    assert_eq!(joined["room"], "R2");
    assert_eq!(recv(&mut b).await, json!({"type": "clientLeft", "clientId": a_id}));

    send(&mut a, json!({"type": "listRooms"})).await;
    let rooms = next_frame(&mut a, WAIT).await.unwrap();
    assert_eq!(rooms["rooms"][0]["clients"].as_array().unwrap().len(), 1);
    assert_eq!(rooms["rooms"][1]["clients"][0]["id"], a_id.as_str());
}

#[tokio::test]
async fn test_rejoining_same_room_is_idempotent() {
    let (addr, _) = start(base()).await;
    let ((mut a, _), (mut b, _)) = pair_in_r1(&addr).await;

    let joined = join(&mut a, "R1", "ann").await;
    assert_eq!(joined["clients"].as_array().unwrap().len(), 2);
    assert!(recv_within(&mut b, Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn test_clean_close_notifies_room() {
    let (addr, rooms) = start(base()).await;
    let ((mut a, a_id), (mut b, _)) = pair_in_r1(&addr).await;

    a.close(None).await.unwrap();
    assert_eq!(recv(&mut b).await, json!({"type": "clientLeft", "clientId": a_id}));

    let summary = rooms.get("R1").unwrap().summary().await.unwrap();
    assert_eq!(summary.clients.len(), 1);
}

// =========================================================================
// Errors
// =========================================================================

#[tokio::test]
async fn test_malformed_frames_get_error_and_connection_survives() {
    let (addr, _) = start(base()).await;
    let (mut a, _) = connect(&addr).await;

    a.send(Message::text("not json at all")).await.unwrap();
    assert_error(&recv(&mut a).await);

    send(&mut a, json!({"type": "flyToMoon"})).await;
    assert_error(&recv(&mut a).await);

    send(&mut a, json!({"type": "joinRoom"})).await;
    assert_error(&recv(&mut a).await);

    // Still usable.
    join(&mut a, "R1", "ann").await;
}

#[tokio::test]
async fn test_unknown_room_is_reported() {
    let (addr, _) = start(base()).await;
    let (mut a, _) = connect(&addr).await;

    send(&mut a, json!({"type": "joinRoom", "roomName": "nowhere"})).await;
    let frame = recv(&mut a).await;
    assert_eq!(frame, json!({"type": "error", "message": "room nowhere not found"}));
}

#[tokio::test]
async fn test_join_unknown_room_keeps_current_room() {
    let (addr, rooms) = start(base()).await;
    let ((mut a, a_id), (mut b, _)) = pair_in_r1(&addr).await;

    send(&mut a, json!({"type": "joinRoom", "roomName": "nowhere"})).await;
    assert_error(&recv(&mut a).await);

    let summary = rooms.get("R1").unwrap().summary().await.unwrap();
    assert!(summary.clients.iter().any(|m| m.id.as_str() == a_id));
    assert!(recv_within(&mut b, Duration::from_millis(200)).await.is_none());

    // Still in R1: relays reach B.
    send(&mut a, json!({"type": "message", "message": {"event": "ping"}})).await;
    let relayed = recv(&mut b).await;
    assert_eq!(relayed["type"], "message");
}

#[tokio::test]
async fn test_room_scoped_frames_need_a_room() {
    let (addr, _) = start(base()).await;
    let (mut a, _) = connect(&addr).await;

    send(&mut a, json!({"type": "message", "message": {"event": "chat"}})).await;
    assert_eq!(recv(&mut a).await, json!({"type": "error", "message": "not in a room"}));

    game_action(&mut a, json!({"type": "start"})).await;
    assert_eq!(recv(&mut a).await, json!({"type": "error", "message": "not in a room"}));
}

#[tokio::test]
async fn test_unknown_game_type_is_reported() {
    let (addr, _) = start(base()).await;
    let ((mut a, _), (mut b, _)) = pair_in_r1(&addr).await;

    send(&mut a, json!({"type": "gameAction", "gameType": "chess", "action": {"type": "start"}})).await;
    assert_eq!(recv(&mut a).await, json!({"type": "error", "message": "unknown game type: chess"}));
    assert!(recv_within(&mut b, Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn test_second_start_conflicts_for_sender_only() {
    let (addr, rooms) = start(base()).await;
    let ((mut a, _), (mut b, _)) = pair_in_r1(&addr).await;

    game_action(&mut a, json!({"type": "start"})).await;
    recv(&mut a).await;
    recv(&mut b).await;
    let before = rooms.get("R1").unwrap().session_snapshot().await.unwrap();

    game_action(&mut b, json!({"type": "start"})).await;
    assert_error(&recv(&mut b).await);
    assert!(recv_within(&mut a, Duration::from_millis(200)).await.is_none());
    assert_eq!(rooms.get("R1").unwrap().session_snapshot().await.unwrap(), before);
}

#[tokio::test]
async fn test_action_without_session_is_reported() {
    let (addr, _) = start(base()).await;
    let ((mut a, _), _b) = pair_in_r1(&addr).await;

    game_action(&mut a, json!({"type": "move", "row": 0, "col": 0})).await;
    assert_eq!(
        recv(&mut a).await,
        json!({"type": "error", "message": "no active game session in this room"})
    );
}

#[tokio::test]
async fn test_malformed_action_reported_to_sender_only() {
    let (addr, _) = start(base()).await;
    let ((mut a, _), (mut b, _)) = pair_in_r1(&addr).await;
    game_action(&mut a, json!({"type": "start"})).await;
    recv(&mut a).await;
    recv(&mut b).await;

    game_action(&mut a, json!({"type": "move", "row": "top"})).await;
    let frame = recv(&mut a).await;
    assert_error(&frame);
    assert!(frame["message"].as_str().unwrap().starts_with("malformed action"));
    assert!(recv_within(&mut b, Duration::from_millis(200)).await.is_none());
}

// =========================================================================
// Game sessions
// =========================================================================

#[tokio::test]
async fn test_two_players_start_and_move() {
    let (addr, _) = start(base()).await;
    let ((mut a, a_id), (mut b, b_id)) = pair_in_r1(&addr).await;

    game_action(&mut a, json!({"type": "start"})).await;
    let a_state = recv(&mut a).await;
    let b_state = recv(&mut b).await;
    assert_eq!(a_state, b_state, "both see the same state");
    assert_eq!(a_state["type"], "gameStateUpdate");
    assert_eq!(a_state["gameType"], "tictactoe");
    assert!(a_state.get("validationError").is_none());
    assert_eq!(
        a_state["state"],
        json!({
            "board": [[null, null, null], [null, null, null], [null, null, null]],
            "players": [a_id, b_id],
            "currentTurn": a_id,
            "winner": null,
            "draw": false
        })
    );

    game_action(&mut a, json!({"type": "move", "row": 0, "col": 0})).await;
    let a_state = recv(&mut a).await;
    let b_state = recv(&mut b).await;
    assert_eq!(a_state, b_state);
    assert_eq!(a_state["state"]["board"][0][0], "X");
    assert_eq!(a_state["state"]["currentTurn"], b_id.as_str());
}

#[tokio::test]
async fn test_rejected_move_is_broadcast_with_reason() {
    let (addr, _) = start(base()).await;
    let ((mut a, a_id), (mut b, _)) = pair_in_r1(&addr).await;
    game_action(&mut a, json!({"type": "start"})).await;
    let initial = recv(&mut a).await;
    recv(&mut b).await;

    // B moves out of turn: everyone sees the rejection, state unchanged.
    game_action(&mut b, json!({"type": "move", "row": 1, "col": 1})).await;
    for ws in [&mut a, &mut b] {
        let frame = recv(ws).await;
        assert_eq!(frame["validationError"], "Not your turn");
        assert_eq!(frame["state"], initial["state"]);
        assert_eq!(frame["state"]["currentTurn"], a_id.as_str());
    }
}

#[tokio::test]
async fn test_full_game_to_a_win() {
    let (addr, _) = start(base()).await;
    let ((mut a, a_id), (mut b, _)) = pair_in_r1(&addr).await;
    game_action(&mut a, json!({"type": "start"})).await;
    recv(&mut a).await;
    recv(&mut b).await;

    let moves = [(true, 0, 0), (false, 1, 0), (true, 0, 1), (false, 1, 1), (true, 0, 2)];
    let mut last = Value::Null;
    for (a_moves, row, col) in moves {
        let mover = if a_moves { &mut a } else { &mut b };
        game_action(mover, json!({"type": "move", "row": row, "col": col})).await;
        last = recv(&mut a).await;
        assert_eq!(recv(&mut b).await, last);
    }
    assert_eq!(last["state"]["winner"], a_id.as_str());

    game_action(&mut b, json!({"type": "move", "row": 2, "col": 2})).await;
    assert_eq!(recv(&mut b).await["validationError"], "Game is already over");
    recv(&mut a).await;

    // Restart is always allowed and clears the board.
    game_action(&mut b, json!({"type": "restart"})).await;
    let restarted = recv(&mut a).await;
    assert_eq!(restarted["state"]["winner"], Value::Null);
    assert_eq!(restarted["state"]["currentTurn"], a_id.as_str());
}

#[tokio::test]
async fn test_late_joiner_receives_state() {
    let (addr, _) = start(base()).await;
    let ((mut a, _), (mut b, _)) = pair_in_r1(&addr).await;
    game_action(&mut a, json!({"type": "start"})).await;
    recv(&mut a).await;
    recv(&mut b).await;
    game_action(&mut a, json!({"type": "move", "row": 2, "col": 0})).await;
    recv(&mut a).await;
    recv(&mut b).await;

    let (mut c, _) = connect(&addr).await;
    let joined = join(&mut c, "R1", "cy").await;
    assert_eq!(joined["clients"].as_array().unwrap().len(), 3);
    let state = recv(&mut c).await;
    assert_eq!(state["type"], "gameStateUpdate");
    assert_eq!(state["state"]["board"][2][0], "X");
}

#[tokio::test]
async fn test_end_stops_session_and_keeps_state() {
    let (addr, rooms) = start(base()).await;
    let ((mut a, _), (mut b, _)) = pair_in_r1(&addr).await;
    game_action(&mut a, json!({"type": "start"})).await;
    recv(&mut a).await;
    recv(&mut b).await;

    game_action(&mut b, json!({"type": "end"})).await;
    let ended = json!({"type": "gameEnded", "gameType": "tictactoe", "reason": "stopped"});
    assert_eq!(recv(&mut a).await, ended);
    assert_eq!(recv(&mut b).await, ended);

    let snapshot = rooms.get("R1").unwrap().session_snapshot().await.unwrap().unwrap();
    assert!(!snapshot.active);

    game_action(&mut a, json!({"type": "move", "row": 0, "col": 0})).await;
    assert_error(&recv(&mut a).await);
}

#[tokio::test]
async fn test_idle_session_expires() {
    let (addr, rooms) = start(base().session_ttl(Duration::from_millis(300))).await;
    let ((mut a, _), (mut b, _)) = pair_in_r1(&addr).await;
    game_action(&mut a, json!({"type": "start"})).await;
    recv(&mut a).await;
    recv(&mut b).await;

    let expired = json!({"type": "gameEnded", "gameType": "tictactoe", "reason": "expired"});
    assert_eq!(recv(&mut a).await, expired);
    assert_eq!(recv(&mut b).await, expired);
    assert_eq!(rooms.get("R1").unwrap().session_snapshot().await.unwrap(), None);
}

// =========================================================================
// Liveness
// =========================================================================

#[tokio::test]
async fn test_abrupt_disconnect_reaped_after_missed_heartbeat() {
    let (addr, rooms) = start(base().heartbeat_interval(Duration::from_millis(100))).await;
    let ((mut a, a_id), (mut b, _)) = pair_in_r1(&addr).await;

    game_action(&mut a, json!({"type": "start"})).await;
    recv(&mut a).await;
    recv(&mut b).await;
    game_action(&mut a, json!({"type": "move", "row": 0, "col": 0})).await;
    recv(&mut a).await;
    recv(&mut b).await;
    let before = rooms.get("R1").unwrap().session_snapshot().await.unwrap();
    assert!(before.is_some());

    // A goes silent: its socket stays open but nothing reads it, so
    // pings go unanswered. B keeps reading and answering.
    let _silent_a = a;

    let left = recv(&mut b).await;
    assert_eq!(left, json!({"type": "clientLeft", "clientId": a_id}));

    // Exactly one clientLeft, and B survives several more sweeps.
    assert!(recv_within(&mut b, Duration::from_millis(500)).await.is_none());

    // Membership and game lifecycles are independent.
    assert_eq!(rooms.get("R1").unwrap().session_snapshot().await.unwrap(), before);
    let summary = rooms.get("R1").unwrap().summary().await.unwrap();
    assert_eq!(summary.clients.len(), 1);
}

#[tokio::test]
async fn test_stalled_handshake_does_not_block_other_clients() {
    let (addr, _) = start(base()).await;

    // Opens TCP and never sends the upgrade request.
    let _stalled = tokio::net::TcpStream::connect(&addr).await.unwrap();

    let connected = time::timeout(Duration::from_secs(3), connect(&addr)).await;
    assert!(connected.is_ok(), "honest client must still connect");
}

#[tokio::test]
async fn test_stalled_handshake_is_dropped_after_timeout() {
    use tokio::io::AsyncReadExt;

    let (addr, _) = start(base().handshake_timeout(Duration::from_millis(200))).await;
    let mut stalled = tokio::net::TcpStream::connect(&addr).await.unwrap();

    // The server closes the socket: the read sees EOF (or a reset).
    let mut buf = [0u8; 16];
    let read = time::timeout(WAIT, stalled.read(&mut buf))
        .await
        .expect("server should drop the stalled peer");
    assert!(matches!(read, Ok(0) | Err(_)), "got {read:?}");
}

#[tokio::test]
async fn test_zero_handshake_timeout_is_rejected() {
    let result = base().handshake_timeout(Duration::ZERO).build().await;
    assert!(matches!(
        result,
        Err(ServerError::Config(ConfigError::Invalid { .. }))
    ));
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_run_until_stops_accepting() {
    let server = base().build().await.unwrap();
    let addr = server.local_addr().unwrap().to_string();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let running = tokio::spawn(server.run_until(async move {
        let _ = stop_rx.await;
    }));
    let (_a, _) = connect(&addr).await;

    stop_tx.send(()).unwrap();
    running.await.unwrap().expect("clean shutdown");

    let result = tokio_tungstenite::connect_async(format!("ws://{addr}")).await;
    assert!(result.is_err(), "listener should be closed");
}
