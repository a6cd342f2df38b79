//! Normalized stage update events.
//!
//! Every frame accepted from the stream becomes one [`StageUpdateEvent`].
//! Events are neither unique nor ordered: the server replays recent updates
//! when a client reconnects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Status reported for a single stage.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The stage has started work.
    Running,

    /// The stage finished and may carry a result payload.
    Completed,

    /// The stage failed. Terminal for that stage.
    Error,
}

/// Category of a [`StageUpdateEvent`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Connection-level notice; carries no stage information.
    Lifecycle,

    /// A stage changed status.
    StageUpdate,

    /// Reply to a liveness ping.
    HeartbeatAck,
}

/// One event received from the workflow stream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct StageUpdateEvent {
    pub kind: EventKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_status: Option<StageStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_payload: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Free-form text attached to lifecycle notices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Timestamp as sent by the server, untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Local time at which the frame was parsed.
    pub received_at: DateTime<Utc>,
}

impl StageUpdateEvent {
    fn empty(kind: EventKind) -> Self {
        Self {
            kind,
            stage_name: None,
            stage_status: None,
            result_payload: None,
            error_message: None,
            message: None,
            timestamp: None,
            received_at: Utc::now(),
        }
    }

    /// Create a stage update for `stage_name` with the given status.
    pub fn stage_update(stage_name: impl Into<String>, status: StageStatus) -> Self {
        Self {
            stage_name: Some(stage_name.into()),
            stage_status: Some(status),
            ..Self::empty(EventKind::StageUpdate)
        }
    }

    /// Create a lifecycle notice.
    pub fn lifecycle(message: Option<String>) -> Self {
        Self {
            message,
            ..Self::empty(EventKind::Lifecycle)
        }
    }

    /// Create a heartbeat acknowledgement.
    pub fn heartbeat_ack() -> Self {
        Self::empty(EventKind::HeartbeatAck)
    }

    /// Attach a result payload.
    pub fn with_result(mut self, payload: Value) -> Self {
        self.result_payload = Some(payload);
        self
    }

    /// Attach an error message.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Attach the server timestamp.
    pub fn with_timestamp(mut self, timestamp: Option<String>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
