//! Test fixtures: configs, wire frames, snapshots and a mock-backed client.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sw_core::config::ClientConfig;
use sw_core::snapshot::StaticSnapshotLoader;
use sw_core::state::AggregatedState;
use sw_core::transport::{ConnectOutcome, MockPeer, MockTransport};
use sw_core::WorkflowClient;
use sw_protocol::{StageResult, WatchSettings, WorkflowSnapshot, WorkflowStatus};
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const TERMINAL_STAGE: &str = "final_review";
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3_000);
pub const PING_INTERVAL: Duration = Duration::from_millis(30_000);

/// Let spawned tasks run until they block on something.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

pub fn test_config() -> ClientConfig {
    ClientConfig::new(WatchSettings {
        terminal_stage: Some(TERMINAL_STAGE.to_string()),
        reconnect_delay_ms: RECONNECT_DELAY.as_millis() as u64,
        ping_interval_ms: PING_INTERVAL.as_millis() as u64,
        ..WatchSettings::default()
    })
}

/// A client wired to a mock transport and a counting snapshot loader.
pub struct Harness {
    pub client: WorkflowClient,
    pub transport: Arc<MockTransport>,
    pub loader: Arc<StaticSnapshotLoader>,
    pub peers: mpsc::UnboundedReceiver<MockPeer>,
    /// Every `workflow_status` a listener observed, in order.
    pub history: Arc<Mutex<Vec<WorkflowStatus>>>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with(Vec::new(), StaticSnapshotLoader::empty()).await
    }

    pub async fn with(script: Vec<ConnectOutcome>, loader: StaticSnapshotLoader) -> Self {
        let (transport, peers) = MockTransport::with_script(script);
        let transport = Arc::new(transport);
        let loader = Arc::new(loader);
        let mut client = WorkflowClient::new(test_config(), transport.clone(), loader.clone());

        let history = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&history);
        client
            .on_change(Arc::new(move |state: &AggregatedState| {
                if let Ok(mut seen) = seen.lock() {
                    seen.push(state.workflow_status);
                }
            }))
            .await;

        Self {
            client,
            transport,
            loader,
            peers,
            history,
        }
    }

    /// Wait for the next accepted connection.
    pub async fn next_peer(&mut self) -> MockPeer {
        let peer = self.peers.recv().await.expect("transport dropped");
        settle().await;
        peer
    }

    pub fn history(&self) -> Vec<WorkflowStatus> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

pub fn agent_update(stage: &str, status: &str) -> Value {
    json!({
        "type": "agent_update",
        "agent": stage,
        "status": status,
        "timestamp": "2025-01-01T00:00:00Z"
    })
}

pub fn completed_with(stage: &str, result: Value) -> Value {
    json!({
        "type": "agent_update",
        "agent": stage,
        "status": "completed",
        "result": result
    })
}

pub fn failed(stage: &str, error: &str) -> Value {
    json!({
        "type": "agent_update",
        "agent": stage,
        "status": "error",
        "error": error
    })
}

/// A snapshot listing the given stages as completed.
pub fn snapshot_with_completed(stages: &[(&str, Value)]) -> WorkflowSnapshot {
    let agent_results: BTreeMap<String, StageResult> = stages
        .iter()
        .map(|(name, result)| {
            (
                name.to_string(),
                StageResult {
                    status: "completed".to_string(),
                    result: Some(result.clone()),
                    execution_time: Some(1.5),
                },
            )
        })
        .collect();

    WorkflowSnapshot {
        workflow_status: Some("running".to_string()),
        agent_results,
    }
}

/// Create a temporary project with a `.stagewatch/config.toml`.
///
/// Returns a TempDir that must be kept alive for the test duration.
#[allow(dead_code)]
pub fn create_test_project(config_toml: &str) -> std::io::Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    let sw_dir = temp_dir.path().join(".stagewatch");
    std::fs::create_dir_all(&sw_dir)?;
    std::fs::write(sw_dir.join("config.toml"), config_toml)?;
    Ok(temp_dir)
}
