//! Stage update aggregation.
//!
//! The [`UpdateAggregator`] folds stream events, connection lifecycle changes
//! and snapshot reconciliation into one [`AggregatedState`]. It is a plain
//! synchronous state machine: callers serialize access (see
//! [`SharedAggregator`]) and every mutation notifies the registered listeners
//! before returning.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use sw_protocol::{
    ConnectionState, EventKind, StageStatus, StageUpdateEvent, WorkflowSnapshot, WorkflowStatus,
    WorkflowView,
};
use tokio::sync::Mutex;

/// Error message recorded for failed stages that did not say why.
const UNKNOWN_STAGE_ERROR: &str = "stage failed without a message";

/// Callback invoked with the new state after every mutation.
pub type StateListener = Arc<dyn Fn(&AggregatedState) + Send + Sync>;

/// Aggregator shared between the dispatch task and readers.
///
/// One lock acquisition covers one whole read-modify-write.
pub type SharedAggregator = Arc<Mutex<UpdateAggregator>>;

/// Consistent view of a workflow built from everything received so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedState {
    /// Every ingested event, in arrival order, duplicates included.
    pub event_log: Vec<StageUpdateEvent>,

    /// Stage most recently reported as running.
    pub current_stage: Option<String>,

    /// Stages that have completed. Only ever grows.
    pub completed_stages: HashSet<String>,

    /// `completed_stages` in the order the stages first completed.
    pub completion_order: Vec<String>,

    /// Last error message per failed stage.
    pub stage_errors: BTreeMap<String, String>,

    /// Payload of the most recent completion per stage.
    pub stage_results: HashMap<String, Value>,

    pub connection_state: ConnectionState,

    pub workflow_status: WorkflowStatus,
}

impl AggregatedState {
    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Open
    }

    /// Consumer-facing copy of this state.
    pub fn to_view(&self, workflow_id: &str) -> WorkflowView {
        WorkflowView {
            workflow_id: workflow_id.to_string(),
            agent_updates: self.event_log.clone(),
            current_agent: self.current_stage.clone(),
            completed_agents: self.completion_order.clone(),
            errors: self.stage_errors.clone(),
            is_connected: self.is_connected(),
            connection_state: self.connection_state,
            workflow_status: self.workflow_status,
        }
    }
}

/// Folds events for one workflow into an [`AggregatedState`].
pub struct UpdateAggregator {
    workflow_id: String,
    terminal_stage: Option<String>,
    state: AggregatedState,
    listeners: Vec<StateListener>,
    /// Stages whose completion arrived on the stream. Snapshot results never
    /// replace what the stream reported for these.
    streamed_completions: HashSet<String>,
    /// A live subscription feeds this state.
    subscribed: bool,
}

impl UpdateAggregator {
    /// Create an aggregator in the `Idle` state.
    ///
    /// # Arguments
    ///
    /// * `workflow_id` - The workflow this state belongs to
    /// * `terminal_stage` - Stage whose completion completes the workflow
    pub fn new(workflow_id: impl Into<String>, terminal_stage: Option<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            terminal_stage,
            state: AggregatedState::default(),
            listeners: Vec::new(),
            streamed_completions: HashSet::new(),
            subscribed: false,
        }
    }

    /// Wrap the aggregator for sharing across tasks.
    pub fn shared(self) -> SharedAggregator {
        Arc::new(Mutex::new(self))
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn state(&self) -> &AggregatedState {
        &self.state
    }

    pub fn view(&self) -> WorkflowView {
        self.state.to_view(&self.workflow_id)
    }

    /// Register a listener called after every mutation.
    pub fn add_listener(&mut self, listener: StateListener) {
        self.listeners.push(listener);
    }

    /// Payload of the most recent completion of `stage`.
    pub fn get_result(&self, stage: &str) -> Option<&Value> {
        self.state.stage_results.get(stage)
    }

    /// A caller subscribed: `Idle -> Connecting`.
    pub fn mark_subscribed(&mut self) {
        self.subscribed = true;
        if self.state.workflow_status == WorkflowStatus::Idle {
            self.state.workflow_status = WorkflowStatus::Connecting;
        }
        self.notify();
    }

    /// The subscription feeding this state went away.
    ///
    /// Only affects where a later [`reset`](Self::reset) lands.
    pub fn mark_unsubscribed(&mut self) {
        self.subscribed = false;
    }

    /// A connection attempt started.
    pub fn on_connecting(&mut self) {
        self.state.connection_state = ConnectionState::Connecting;
        self.notify();
    }

    /// The stream opened. The first open moves the workflow to `Running`.
    pub fn on_open(&mut self) {
        self.state.connection_state = ConnectionState::Open;
        if matches!(
            self.state.workflow_status,
            WorkflowStatus::Idle | WorkflowStatus::Connecting
        ) {
            self.state.workflow_status = WorkflowStatus::Running;
        }
        self.notify();
    }

    /// The transport reported an error. Workflow status is untouched.
    pub fn on_error(&mut self) {
        self.state.connection_state = ConnectionState::Error;
        self.notify();
    }

    /// The stream closed.
    ///
    /// A close that follows a transport error keeps the `Error` state so
    /// the failure stays visible until the next attempt.
    pub fn on_close(&mut self, code: u16) {
        tracing::debug!(workflow_id = %self.workflow_id, code, "stream closed");
        if self.state.connection_state != ConnectionState::Error {
            self.state.connection_state = ConnectionState::Closed;
        }
        self.notify();
    }

    /// Fold one event into the state.
    ///
    /// The event is always appended to the log, duplicates included.
    pub fn ingest(&mut self, event: StageUpdateEvent) {
        if event.kind == EventKind::StageUpdate {
            if let (Some(stage), Some(status)) = (event.stage_name.clone(), event.stage_status) {
                match status {
                    StageStatus::Running => {
                        self.state.current_stage = Some(stage);
                    }
                    StageStatus::Completed => {
                        match event.result_payload.clone() {
                            Some(payload) => {
                                self.state.stage_results.insert(stage.clone(), payload);
                            }
                            None => {
                                self.state.stage_results.remove(&stage);
                            }
                        }
                        self.streamed_completions.insert(stage.clone());
                        self.mark_completed(stage);
                    }
                    StageStatus::Error => {
                        let message = event
                            .error_message
                            .clone()
                            .unwrap_or_else(|| UNKNOWN_STAGE_ERROR.to_string());
                        self.state.stage_errors.insert(stage, message);
                        self.enter_terminal(WorkflowStatus::Error);
                    }
                }
            }
        }

        self.state.event_log.push(event);
        self.notify();
    }

    /// Merge a snapshot without removing or overwriting local data.
    ///
    /// Completed stages and errors are added only when absent; a snapshot
    /// result is used only if no completion was streamed for that stage.
    pub fn merge_snapshot(&mut self, snapshot: &WorkflowSnapshot) {
        for (stage, result) in &snapshot.agent_results {
            if result.is_completed() {
                if !self.streamed_completions.contains(stage)
                    && !self.state.stage_results.contains_key(stage)
                {
                    if let Some(payload) = &result.result {
                        self.state
                            .stage_results
                            .insert(stage.clone(), payload.clone());
                    }
                }
                self.mark_completed(stage.clone());
            } else if result.is_error() {
                if !self.state.stage_errors.contains_key(stage) {
                    self.state
                        .stage_errors
                        .insert(stage.clone(), result.error_message());
                }
                self.enter_terminal(WorkflowStatus::Error);
            }
        }
        self.notify();
    }

    /// Forget everything received so far.
    ///
    /// The connection is not touched, so `connection_state` is kept. A live
    /// subscription lands in `Running` when the stream is open and in
    /// `Connecting` otherwise; only an unbound state goes back to `Idle`.
    pub fn reset(&mut self) {
        let connection_state = self.state.connection_state;
        let workflow_status = match (self.subscribed, connection_state) {
            (false, _) => WorkflowStatus::Idle,
            (true, ConnectionState::Open) => WorkflowStatus::Running,
            (true, _) => WorkflowStatus::Connecting,
        };
        self.state = AggregatedState {
            connection_state,
            workflow_status,
            ..AggregatedState::default()
        };
        self.streamed_completions.clear();
        self.notify();
    }

    fn mark_completed(&mut self, stage: String) {
        if self.state.completed_stages.insert(stage.clone()) {
            self.state.completion_order.push(stage.clone());
        }
        if self.terminal_stage.as_deref() == Some(stage.as_str()) {
            self.enter_terminal(WorkflowStatus::Completed);
        }
    }

    fn enter_terminal(&mut self, status: WorkflowStatus) {
        if self.state.workflow_status.is_terminal() {
            return;
        }
        self.state.workflow_status = status;
    }

    fn notify(&self) {
        for listener in &self.listeners {
            listener(&self.state);
        }
    }
}
