//! Connection and workflow status, and the view exposed to consumers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::stage_models::StageUpdateEvent;

/// State of the transport connection.
///
/// Changes on every connect/disconnect cycle, unlike [`WorkflowStatus`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// A connection attempt is in progress.
    Connecting,

    /// The stream is open.
    Open,

    /// No connection, either never opened or closed.
    #[default]
    Closed,

    /// The last attempt or the live connection failed.
    Error,
}

/// Overall status of the tracked workflow.
///
/// Progresses `Idle -> Connecting -> Running -> {Completed, Error}`.
/// `Completed` and `Error` are sticky until an explicit reset.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Nothing subscribed yet.
    #[default]
    Idle,

    /// Subscribed, waiting for the first successful connection.
    Connecting,

    /// Connected at least once and no terminal state reached.
    Running,

    /// The terminal stage completed.
    Completed,

    /// At least one stage reported an error.
    Error,
}

impl WorkflowStatus {
    /// Whether the status can no longer change without a reset.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Error)
    }
}

/// Read-only view of an aggregated workflow, as handed to consumers.
///
/// Serialized in camelCase for front-end clients.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowView {
    /// Workflow the view belongs to.
    pub workflow_id: String,

    /// Every event received so far, in arrival order.
    pub agent_updates: Vec<StageUpdateEvent>,

    /// Stage most recently reported as running.
    pub current_agent: Option<String>,

    /// Completed stages in the order they first completed.
    pub completed_agents: Vec<String>,

    /// Last error message per failed stage.
    pub errors: BTreeMap<String, String>,

    pub is_connected: bool,

    pub connection_state: ConnectionState,

    pub workflow_status: WorkflowStatus,
}
