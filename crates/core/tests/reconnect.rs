//! Integration tests for reconnect behavior through the public client.
//!
//! These tests verify that:
//! - An abnormal disconnect schedules exactly one reconnect after the delay
//! - Explicit unsubscribe cancels any pending reconnect
//! - Every successful open fetches exactly one snapshot
//! - Terminal workflow status survives any number of reconnects

mod common;

use common::*;
use serde_json::json;
use std::time::Duration;
use sw_core::snapshot::StaticSnapshotLoader;
use sw_core::transport::ConnectOutcome;
use sw_protocol::{ConnectionState, OutboundMessage, WorkflowStatus};

#[tokio::test(start_paused = true)]
async fn test_abnormal_disconnect_reconnects_once_after_delay() {
    let mut h = Harness::new().await;

    h.client.subscribe("wf-1").await.expect("subscribe");
    h.next_peer().await.drop_connection();
    settle().await;

    assert_eq!(h.transport.attempts(), 1);
    assert_eq!(
        h.client.state().await.expect("state").connection_state,
        ConnectionState::Closed
    );

    tokio::time::advance(RECONNECT_DELAY - Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(h.transport.attempts(), 1, "reconnected before the delay elapsed");

    tokio::time::advance(Duration::from_millis(1)).await;
    let _peer = h.next_peer().await;
    assert_eq!(h.transport.attempts(), 2);

    tokio::time::advance(RECONNECT_DELAY * 3).await;
    settle().await;
    assert_eq!(h.transport.attempts(), 2, "open connection must not reconnect");
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_cancels_pending_reconnect() {
    let mut h = Harness::new().await;

    h.client.subscribe("wf-1").await.expect("subscribe");
    h.next_peer().await.drop_connection();
    settle().await;

    h.client.unsubscribe().await;
    tokio::time::advance(RECONNECT_DELAY * 5).await;
    settle().await;

    assert_eq!(h.transport.attempts(), 1);
    assert!(!h.client.is_subscribed());
}

#[tokio::test(start_paused = true)]
async fn test_normal_close_is_final() {
    let mut h = Harness::new().await;

    h.client.subscribe("wf-1").await.expect("subscribe");
    h.next_peer().await.close(1000);
    settle().await;

    tokio::time::advance(RECONNECT_DELAY * 5).await;
    settle().await;
    assert_eq!(h.transport.attempts(), 1);

    // Subscribing again to the same workflow restarts the finished stream.
    h.client.subscribe("wf-1").await.expect("resubscribe");
    let _peer = h.next_peer().await;
    assert_eq!(h.transport.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_fetched_once_per_successful_open() {
    let refuse = || ConnectOutcome::Refuse("connection refused".to_string());
    let mut h = Harness::with(
        vec![ConnectOutcome::Accept, refuse(), refuse()],
        StaticSnapshotLoader::empty(),
    )
    .await;

    h.client.subscribe("wf-1").await.expect("subscribe");
    h.next_peer().await.fail("reset by peer");
    settle().await;
    assert_eq!(h.loader.calls(), 1);

    // Two refused attempts, then an accepted one.
    tokio::time::advance(RECONNECT_DELAY).await;
    settle().await;
    assert_eq!(
        h.client.state().await.expect("state").connection_state,
        ConnectionState::Error
    );
    tokio::time::advance(RECONNECT_DELAY).await;
    settle().await;
    tokio::time::advance(RECONNECT_DELAY).await;
    let _peer = h.next_peer().await;

    assert_eq!(h.transport.attempts(), 4);
    assert_eq!(h.loader.calls(), 2);
    assert_eq!(
        h.client.state().await.expect("state").connection_state,
        ConnectionState::Open
    );
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_fills_gap_missed_while_disconnected() {
    let mut h = Harness::new().await;

    h.client.subscribe("wf-1").await.expect("subscribe");
    let peer = h.next_peer().await;
    peer.send_json(&completed_with("plan", json!({"tasks": 4})));
    settle().await;
    peer.drop_connection();
    settle().await;

    // While offline, the server finished "build".
    h.loader
        .set_response(Ok(snapshot_with_completed(&[
            ("plan", json!({"tasks": 99})),
            ("build", json!({"artifact": "app.tar"})),
        ])))
        .await;

    tokio::time::advance(RECONNECT_DELAY).await;
    let _peer = h.next_peer().await;

    let view = h.client.state().await.expect("state");
    assert_eq!(view.completed_agents, vec!["plan", "build"]);
    assert_eq!(
        h.client.get_result("plan").await,
        Some(json!({"tasks": 4})),
        "streamed result must not be overwritten by the snapshot"
    );
    assert_eq!(
        h.client.get_result("build").await,
        Some(json!({"artifact": "app.tar"}))
    );
}

#[tokio::test(start_paused = true)]
async fn test_completed_status_survives_reconnects() {
    let mut h = Harness::new().await;

    h.client.subscribe("wf-1").await.expect("subscribe");
    let mut peer = h.next_peer().await;
    peer.send_json(&agent_update(TERMINAL_STAGE, "completed"));
    settle().await;

    for _ in 0..3 {
        peer.fail("flaky network");
        settle().await;
        tokio::time::advance(RECONNECT_DELAY).await;
        peer = h.next_peer().await;
        peer.send_json(&agent_update("plan", "running"));
        settle().await;
    }

    assert_eq!(h.transport.attempts(), 4);
    let view = h.client.state().await.expect("state");
    assert_eq!(view.workflow_status, WorkflowStatus::Completed);
    assert_never_leaves_terminal(&h.history());
    assert_never_regresses_to_connecting(&h.history());
}

#[tokio::test(start_paused = true)]
async fn test_error_status_survives_reconnects() {
    let mut h = Harness::new().await;

    h.client.subscribe("wf-1").await.expect("subscribe");
    let peer = h.next_peer().await;
    peer.send_json(&failed("build", "compiler crashed"));
    settle().await;
    peer.drop_connection();
    settle().await;

    tokio::time::advance(RECONNECT_DELAY).await;
    let peer = h.next_peer().await;
    peer.send_json(&agent_update(TERMINAL_STAGE, "completed"));
    settle().await;

    let view = h.client.state().await.expect("state");
    assert_eq!(view.workflow_status, WorkflowStatus::Error);
    assert_eq!(view.errors["build"], "compiler crashed");
    assert_never_leaves_terminal(&h.history());
}

#[tokio::test(start_paused = true)]
async fn test_pings_flow_while_open() {
    let mut h = Harness::new().await;

    h.client.subscribe("wf-1").await.expect("subscribe");
    let mut peer = h.next_peer().await;

    tokio::time::advance(PING_INTERVAL).await;
    settle().await;
    assert_eq!(peer.try_recv_outbound(), Some(OutboundMessage::Ping));

    // A pong is an ordinary event and does not change stage state.
    peer.send_json(&json!({"type": "pong", "timestamp": "2025-01-01T00:00:30Z"}));
    settle().await;
    let view = h.client.state().await.expect("state");
    assert_eq!(view.agent_updates.len(), 1);
    assert!(view.current_agent.is_none());
}
