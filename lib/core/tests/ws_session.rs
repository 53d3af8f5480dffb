mod common;

use common::MockEngine;
use http::{HeaderMap, Method};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

use trailhead_core::config::websocket::WebSocketConfig;
use trailhead_core::config::TrailheadConfig;
use trailhead_core::ws::{Outbound, ServerMessage};
use trailhead_core::{
    AdmissionError, ConnectionGuard, ConnectionInfo, Session, SharedState,
};

fn connection_info() -> ConnectionInfo {
    ConnectionInfo {
        method: Method::GET,
        uri: "/graphql".parse().unwrap(),
        headers: HeaderMap::new(),
    }
}

fn open_with_config(config: TrailheadConfig) -> (Session<MockEngine>, mpsc::Receiver<Outbound>) {
    let state = Arc::new(SharedState::new(MockEngine::new(), config));
    Session::open(state, connection_info(), Arc::new(()), Arc::new(()))
}

fn open() -> (Session<MockEngine>, mpsc::Receiver<Outbound>) {
    open_with_config(TrailheadConfig::default())
}

async fn recv(rx: &mut mpsc::Receiver<Outbound>) -> Outbound {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for an outbound message")
        .expect("outbound channel closed")
}

async fn expect_close(rx: &mut mpsc::Receiver<Outbound>, code: u16) {
    match recv(rx).await {
        Outbound::Close(frame) => assert_eq!(frame.code, code, "reason: {}", frame.reason),
        other => panic!("expected a close frame, got {other:?}"),
    }
}

async fn init(session: &Session<MockEngine>, rx: &mut mpsc::Receiver<Outbound>) {
    session.on_message(r#"{"type":"connection_init"}"#).await;
    match recv(rx).await {
        Outbound::Message(ServerMessage::ConnectionAck {}) => {}
        other => panic!("expected connection_ack, got {other:?}"),
    }
}

fn subscribe_text(id: &str, query: &str) -> String {
    sonic_rs::to_string(&sonic_rs::json!({
        "type": "subscribe",
        "id": id,
        "payload": { "query": query },
    }))
    .unwrap()
}

/// Waits until the session reports zero active operations.
async fn wait_released(session: &Session<MockEngine>) {
    timeout(Duration::from_secs(1), async {
        while session.active_operations() != 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("operation was not released in time");
}

#[tokio::test]
async fn connection_init_is_acknowledged() {
    let (session, mut rx) = open();
    init(&session, &mut rx).await;
    assert_eq!(session.phase(), trailhead_core::ws::Phase::Admitted);
}

#[tokio::test]
async fn traffic_before_init_is_unauthorized() {
    let (session, mut rx) = open();
    session
        .on_message(&subscribe_text("1", "{ hello }"))
        .await;
    expect_close(&mut rx, 4401).await;
    assert_eq!(session.phase(), trailhead_core::ws::Phase::Closed);
}

#[tokio::test]
async fn duplicate_connection_init_closes_the_connection() {
    let (session, mut rx) = open();
    init(&session, &mut rx).await;
    session.on_message(r#"{"type":"connection_init"}"#).await;
    expect_close(&mut rx, 4429).await;
}

struct RejectingGuard;

#[async_trait::async_trait]
impl ConnectionGuard for RejectingGuard {
    async fn admit(
        &self,
        _info: &ConnectionInfo,
        payload: Option<&sonic_rs::Value>,
    ) -> Result<(), AdmissionError> {
        assert!(payload.is_some(), "guard should see the init payload");
        Err(AdmissionError::new("token expired"))
    }
}

#[tokio::test]
async fn the_guard_can_veto_admission() {
    let state = Arc::new(SharedState::new(MockEngine::new(), TrailheadConfig::default()));
    let (session, mut rx) = Session::open(
        state,
        connection_info(),
        Arc::new(RejectingGuard),
        Arc::new(()),
    );

    session
        .on_message(r#"{"type":"connection_init","payload":{"token":"stale"}}"#)
        .await;
    match recv(&mut rx).await {
        Outbound::Close(frame) => {
            assert_eq!(frame.code, 4403);
            assert_eq!(frame.reason, "token expired");
        }
        other => panic!("expected a close frame, got {other:?}"),
    }
    assert_eq!(session.phase(), trailhead_core::ws::Phase::Closed);
}

#[tokio::test]
async fn ping_is_answered_with_pong_before_admission() {
    let (session, mut rx) = open();
    session.on_message(r#"{"type":"ping"}"#).await;
    match recv(&mut rx).await {
        Outbound::Message(ServerMessage::Pong {}) => {}
        other => panic!("expected pong, got {other:?}"),
    }
}

#[tokio::test]
async fn single_result_operations_emit_next_then_complete() {
    let (session, mut rx) = open();
    init(&session, &mut rx).await;

    session
        .on_message(&subscribe_text("op-1", "{ hello }"))
        .await;

    match recv(&mut rx).await {
        Outbound::Message(ServerMessage::Next { id, payload }) => {
            assert_eq!(id, "op-1");
            assert_eq!(payload.data, Some(sonic_rs::json!({ "hello": "world" })));
        }
        other => panic!("expected next, got {other:?}"),
    }
    match recv(&mut rx).await {
        Outbound::Message(ServerMessage::Complete { id }) => assert_eq!(id, "op-1"),
        other => panic!("expected complete, got {other:?}"),
    }
    wait_released(&session).await;
}

#[tokio::test]
async fn streams_pump_every_item_then_complete() {
    let (session, mut rx) = open();
    init(&session, &mut rx).await;

    session
        .on_message(&subscribe_text("op-1", "subscription { count }"))
        .await;

    for expected in 0..3 {
        match recv(&mut rx).await {
            Outbound::Message(ServerMessage::Next { id, payload }) => {
                assert_eq!(id, "op-1");
                assert_eq!(payload.data, Some(sonic_rs::json!({ "count": expected })));
            }
            other => panic!("expected next #{expected}, got {other:?}"),
        }
    }
    match recv(&mut rx).await {
        Outbound::Message(ServerMessage::Complete { id }) => assert_eq!(id, "op-1"),
        other => panic!("expected complete, got {other:?}"),
    }
}

#[tokio::test]
async fn unsubscribing_cancels_the_operation_and_releases_it() {
    let (session, mut rx) = open();
    init(&session, &mut rx).await;

    session
        .on_message(&subscribe_text("op-1", "subscription { ticks }"))
        .await;

    // the infinite stream is alive
    match recv(&mut rx).await {
        Outbound::Message(ServerMessage::Next { id, .. }) => assert_eq!(id, "op-1"),
        other => panic!("expected next, got {other:?}"),
    }

    session
        .on_message(r#"{"type":"complete","id":"op-1"}"#)
        .await;

    // the resource handle must report released within a bounded time
    wait_released(&session).await;

    // drain whatever was already queued, then expect silence: no further
    // messages for the cancelled id, and no complete for a cancelled op
    while let Ok(message) = rx.try_recv() {
        match message {
            Outbound::Message(ServerMessage::Next { id, .. }) => assert_eq!(id, "op-1"),
            other => panic!("unexpected message while draining: {other:?}"),
        }
    }
    assert!(
        timeout(Duration::from_millis(200), rx.recv()).await.is_err(),
        "messages kept flowing after cancellation"
    );
}

#[tokio::test]
async fn duplicate_operation_ids_are_rejected() {
    let (session, mut rx) = open();
    init(&session, &mut rx).await;

    session
        .on_message(&subscribe_text("op-1", "subscription { ticks }"))
        .await;
    session
        .on_message(&subscribe_text("op-1", "subscription { ticks }"))
        .await;

    // skip any queued results until the close arrives
    loop {
        match recv(&mut rx).await {
            Outbound::Close(frame) => {
                assert_eq!(frame.code, 4409);
                break;
            }
            Outbound::Message(ServerMessage::Next { .. }) => continue,
            other => panic!("unexpected message: {other:?}"),
        }
    }
    wait_released(&session).await;
}

#[tokio::test]
async fn unknown_operation_ids_on_complete_are_ignored() {
    let (session, mut rx) = open();
    init(&session, &mut rx).await;
    session
        .on_message(r#"{"type":"complete","id":"ghost"}"#)
        .await;
    assert!(
        timeout(Duration::from_millis(100), rx.recv()).await.is_err(),
        "an unknown id should not produce output"
    );
    assert_eq!(session.phase(), trailhead_core::ws::Phase::Admitted);
}

#[tokio::test]
async fn malformed_frames_close_with_bad_request() {
    let (session, mut rx) = open();
    session.on_message("definitely not json").await;
    expect_close(&mut rx, 4400).await;
}

#[tokio::test]
async fn subscribe_payload_without_query_reports_per_operation() {
    let (session, mut rx) = open();
    init(&session, &mut rx).await;

    session
        .on_message(r#"{"type":"subscribe","id":"op-1","payload":{}}"#)
        .await;

    match recv(&mut rx).await {
        Outbound::Message(ServerMessage::Error { id, payload }) => {
            assert_eq!(id, "op-1");
            assert_eq!(payload[0].message, "Missing query parameter");
        }
        other => panic!("expected an error message, got {other:?}"),
    }
    // the connection stays usable
    assert_eq!(session.phase(), trailhead_core::ws::Phase::Admitted);
}

#[tokio::test]
async fn engine_faults_surface_as_generic_operation_errors() {
    let (session, mut rx) = open();
    init(&session, &mut rx).await;

    session.on_message(&subscribe_text("op-1", "{ boom }")).await;

    match recv(&mut rx).await {
        Outbound::Message(ServerMessage::Error { id, payload }) => {
            assert_eq!(id, "op-1");
            assert_eq!(payload[0].message, "Unexpected error");
        }
        other => panic!("expected an error message, got {other:?}"),
    }
}

#[tokio::test]
async fn closing_the_session_cancels_every_operation() {
    let (session, mut rx) = open();
    init(&session, &mut rx).await;

    session
        .on_message(&subscribe_text("op-1", "subscription { ticks }"))
        .await;
    session
        .on_message(&subscribe_text("op-2", "subscription { ticks }"))
        .await;

    // both operations are streaming
    match recv(&mut rx).await {
        Outbound::Message(ServerMessage::Next { .. }) => {}
        other => panic!("expected next, got {other:?}"),
    }

    session.close();
    assert_eq!(session.phase(), trailhead_core::ws::Phase::Closed);
    wait_released(&session).await;

    // further messages are ignored once closed
    session
        .on_message(&subscribe_text("op-3", "subscription { ticks }"))
        .await;
    assert_eq!(session.active_operations(), 0);
}

#[tokio::test]
async fn missing_connection_init_times_out() {
    let config = TrailheadConfig {
        websocket: WebSocketConfig {
            connection_init_timeout: Duration::from_millis(50),
            ..Default::default()
        },
        ..Default::default()
    };
    let (_session, mut rx) = open_with_config(config);
    expect_close(&mut rx, 4408).await;
}

#[tokio::test]
async fn keepalive_pings_and_eventually_times_out() {
    let config = TrailheadConfig {
        websocket: WebSocketConfig {
            keepalive_interval: Duration::from_millis(30),
            keepalive_timeout: Duration::from_millis(50),
            ..Default::default()
        },
        ..Default::default()
    };
    let (session, mut rx) = open_with_config(config);
    init(&session, &mut rx).await;

    match recv(&mut rx).await {
        Outbound::Message(ServerMessage::Ping {}) => {}
        other => panic!("expected a keepalive ping, got {other:?}"),
    }

    // never answer: the peer is declared dead with a protocol error
    loop {
        match recv(&mut rx).await {
            Outbound::Message(ServerMessage::Ping {}) => continue,
            Outbound::Close(frame) => {
                assert_eq!(frame.code, 1002);
                break;
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

#[tokio::test]
async fn pongs_keep_the_connection_alive() {
    let config = TrailheadConfig {
        websocket: WebSocketConfig {
            keepalive_interval: Duration::from_millis(20),
            keepalive_timeout: Duration::from_millis(100),
            ..Default::default()
        },
        ..Default::default()
    };
    let (session, mut rx) = open_with_config(config);
    init(&session, &mut rx).await;

    // answer pings for a while; the connection must stay open well past
    // the keepalive timeout
    let deadline = tokio::time::Instant::now() + Duration::from_millis(200);
    while tokio::time::Instant::now() < deadline {
        if let Ok(Some(message)) = timeout(Duration::from_millis(30), rx.recv()).await {
            match message {
                Outbound::Message(ServerMessage::Ping {}) => {
                    session.on_message(r#"{"type":"pong"}"#).await;
                }
                Outbound::Close(frame) => panic!("connection closed early: {frame:?}"),
                other => panic!("unexpected message: {other:?}"),
            }
        }
    }
    assert_eq!(session.phase(), trailhead_core::ws::Phase::Admitted);
}
