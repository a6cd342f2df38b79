//! Settings models for `.stagewatch/config.toml`.
//!
//! This module defines the structure of the configuration file that points
//! the client at a backend and tunes its connection behavior.

use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

/// Default reconnect delay after an abnormal disconnect.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3_000;

/// Default interval between liveness pings.
pub const DEFAULT_PING_INTERVAL_MS: u64 = 30_000;

/// Represents settings from `.stagewatch/config.toml`.
///
/// Every field is optional in the file; missing fields take the defaults
/// below.
///
/// # Example
///
/// ```toml
/// # .stagewatch/config.toml
/// ws_base_url = "ws://localhost:8000"
/// api_base_url = "http://localhost:8000"
/// terminal_stage = "final_review"
/// reconnect_delay_ms = 3000
/// ping_interval_ms = 30000
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default)]
pub struct WatchSettings {
    /// Base URL of the event stream. The stream for a workflow lives at
    /// `{ws_base_url}/ws/{workflow_id}`.
    pub ws_base_url: String,

    /// Base URL of the REST API. The snapshot for a workflow lives at
    /// `{api_base_url}/workflows/{workflow_id}/status`.
    pub api_base_url: String,

    /// Stage whose completion marks the whole workflow as completed.
    ///
    /// Without it, the workflow never reaches `completed` on its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_stage: Option<String>,

    /// Fixed delay before reconnecting after an abnormal disconnect.
    pub reconnect_delay_ms: u64,

    /// Interval between liveness pings while connected.
    pub ping_interval_ms: u64,

    /// Force a reconnect when nothing arrives this long after a ping.
    ///
    /// Disabled unless set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_ack_timeout_ms: Option<u64>,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            ws_base_url: "ws://localhost:8000".to_string(),
            api_base_url: "http://localhost:8000".to_string(),
            terminal_stage: None,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            ping_interval_ms: DEFAULT_PING_INTERVAL_MS,
            ping_ack_timeout_ms: None,
        }
    }
}
