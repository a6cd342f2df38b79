//! Point-in-time workflow snapshot.
//!
//! Returned by the workflow status endpoint and merged into live state after
//! every successful (re)connect.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use ts_rs::TS;

/// Result of one stage as reported by the snapshot endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct StageResult {
    /// Stage status as a raw string.
    ///
    /// Only `"completed"` and `"error"` are merged; anything else is
    /// informational.
    pub status: String,

    /// Result payload for completed stages, or an error description for
    /// failed ones.
    #[serde(default)]
    pub result: Option<Value>,

    /// Wall-clock execution time in seconds, when the server tracks it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

impl StageResult {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    pub fn is_error(&self) -> bool {
        self.status == "error"
    }

    /// Human-readable error message for a failed stage.
    ///
    /// Uses the result when it is a string or an object with a string
    /// `error`/`message` field; falls back to a generic message.
    pub fn error_message(&self) -> String {
        match &self.result {
            Some(Value::String(message)) => message.clone(),
            Some(Value::Object(fields)) => fields
                .get("error")
                .or_else(|| fields.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| "stage failed".to_string()),
            _ => "stage failed".to_string(),
        }
    }
}

/// Snapshot of everything the server already knows about a workflow.
///
/// # Example
///
/// ```json
/// {
///   "workflow_status": "running",
///   "agent_results": {
///     "venue_scout": {"status": "completed", "result": {"venues": 3}, "execution_time": 1.5}
///   }
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct WorkflowSnapshot {
    /// Server-side workflow status. Informational only; local status is
    /// derived from stage results.
    #[serde(default)]
    pub workflow_status: Option<String>,

    /// Known stage results keyed by stage name.
    #[serde(default)]
    pub agent_results: BTreeMap<String, StageResult>,
}
