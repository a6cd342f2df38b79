//! Event stream wire format.
//!
//! Every frame on the stream is a text message carrying one JSON object.
//! The `type` field selects the variant:
//!
//! ```json
//! {
//!   "type": "agent_update",
//!   "agent": "venue_scout",
//!   "status": "completed",
//!   "result": {"venues": 3},
//!   "timestamp": "2024-05-01T12:00:00Z"
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::stage_models::StageStatus;

/// Messages received from the workflow event stream.
///
/// Frames whose `type` is not one of these variants fail to deserialize and
/// are dropped by the client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// A stage changed status.
    AgentUpdate(StageReport),

    /// Connection-level notice from the server, such as a welcome message.
    Connection(ConnectionNotice),

    /// Reply to an explicit `status` request.
    ///
    /// Carries the same fields as `agent_update` when the server reports a
    /// stage, or only a message otherwise.
    StatusResponse(StageReport),

    /// Reply to a liveness ping.
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
}

/// Stage fields shared by `agent_update` and `status_response` frames.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct StageReport {
    /// Name of the stage (the server calls stages "agents").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StageStatus>,

    /// Opaque result payload of a completed stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Body of a `connection` frame.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct ConnectionNotice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Messages sent by the client over the event stream.
///
/// Serializes as `{"type":"ping"}` and `{"type":"status"}`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Periodic liveness ping.
    Ping,

    /// Ask the server to re-send the current workflow status.
    Status,
}
