//! Consumer-facing client for workflow progress.
//!
//! `WorkflowClient` keeps one aggregated state per workflow id it has ever
//! subscribed to, and at most one live [`SubscriptionHandle`]. Unsubscribing
//! stops the stream but keeps the state, so a later `subscribe` to the same
//! workflow continues where it left off.
//!
//! # Example
//!
//! ```rust,no_run
//! use sw_core::client::WorkflowClient;
//! use sw_core::config::ClientConfig;
//! use sw_core::state::AggregatedState;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = WorkflowClient::from_config(ClientConfig::default());
//! client
//!     .on_change(Arc::new(|state: &AggregatedState| {
//!         println!("{:?}", state.workflow_status)
//!     }))
//!     .await;
//! client.subscribe("wf-42").await?;
//! # Ok(())
//! # }
//! ```

use crate::client::handle::SubscriptionHandle;
use crate::config::ClientConfig;
use crate::connection::ConnectionError;
use crate::snapshot::{HttpSnapshotLoader, InitialStateLoader};
use crate::state::{SharedAggregator, StateListener, UpdateAggregator};
use crate::transport::{Transport, WebSocketTransport};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use sw_protocol::WorkflowView;

pub struct WorkflowClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    loader: Arc<dyn InitialStateLoader>,
    states: HashMap<String, SharedAggregator>,
    listeners: Vec<StateListener>,
    bound: Option<String>,
    active: Option<SubscriptionHandle>,
}

impl WorkflowClient {
    /// Create a client with explicit transport and snapshot backends.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        loader: Arc<dyn InitialStateLoader>,
    ) -> Self {
        Self {
            config,
            transport,
            loader,
            states: HashMap::new(),
            listeners: Vec::new(),
            bound: None,
            active: None,
        }
    }

    /// Create a client that talks WebSocket and HTTP to the configured URLs.
    pub fn from_config(config: ClientConfig) -> Self {
        let transport = Arc::new(WebSocketTransport::new(config.settings.ws_base_url.clone()));
        let loader = Arc::new(HttpSnapshotLoader::new(config.settings.api_base_url.clone()));
        Self::new(config, transport, loader)
    }

    /// Workflow the client is (or was last) bound to.
    pub fn workflow_id(&self) -> Option<&str> {
        self.bound.as_deref()
    }

    /// Whether a subscription is live.
    pub fn is_subscribed(&self) -> bool {
        self.active.is_some()
    }

    /// Start following `workflow_id`.
    ///
    /// Subscribing to the workflow that is already bound is a no-op. Any other
    /// subscription is torn down first; its state stays available through
    /// [`state_for`](Self::state_for).
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::EmptyWorkflowId` if `workflow_id` is empty.
    pub async fn subscribe(&mut self, workflow_id: &str) -> Result<(), ConnectionError> {
        if workflow_id.is_empty() {
            return Err(ConnectionError::EmptyWorkflowId);
        }

        if let Some(handle) = self.active.as_mut() {
            if handle.workflow_id() == workflow_id {
                return handle.ensure_open();
            }
        }

        self.unsubscribe().await;

        let state = self.aggregator_for(workflow_id).await;
        state.lock().await.mark_subscribed();

        let handle = SubscriptionHandle::open(
            workflow_id,
            Arc::clone(&self.transport),
            Arc::clone(&self.loader),
            self.config.connection_settings(),
            state,
        )?;

        tracing::info!(workflow_id, "subscribed");
        self.bound = Some(workflow_id.to_string());
        self.active = Some(handle);
        Ok(())
    }

    /// Ask the server for a status report on the open stream.
    ///
    /// Returns false (and does nothing) when no stream is open.
    pub fn request_status(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(SubscriptionHandle::request_status)
    }

    /// Stop the live subscription. The aggregated state is kept.
    pub async fn unsubscribe(&mut self) {
        if let Some(mut handle) = self.active.take() {
            handle.close().await;
            tracing::info!(workflow_id = handle.workflow_id(), "unsubscribed");
        }
    }

    /// Result payload of a completed stage in the bound workflow.
    pub async fn get_result(&self, stage: &str) -> Option<Value> {
        let state = self.bound_state()?;
        let aggregator = state.lock().await;
        aggregator.get_result(stage).cloned()
    }

    /// View of the bound (or last bound) workflow.
    pub async fn state(&self) -> Option<WorkflowView> {
        let state = self.bound_state()?;
        let view = state.lock().await.view();
        Some(view)
    }

    /// View of any workflow this client has subscribed to.
    pub async fn state_for(&self, workflow_id: &str) -> Option<WorkflowView> {
        let state = self.states.get(workflow_id)?;
        let view = state.lock().await.view();
        Some(view)
    }

    /// Clear the bound workflow's state. See [`UpdateAggregator::reset`].
    pub async fn reset(&self) {
        if let Some(state) = self.bound_state() {
            state.lock().await.reset();
        }
    }

    /// Register a listener for every state change, on current and future
    /// workflows.
    pub async fn on_change(&mut self, listener: StateListener) {
        for state in self.states.values() {
            state.lock().await.add_listener(Arc::clone(&listener));
        }
        self.listeners.push(listener);
    }

    fn bound_state(&self) -> Option<&SharedAggregator> {
        self.states.get(self.bound.as_deref()?)
    }

    async fn aggregator_for(&mut self, workflow_id: &str) -> SharedAggregator {
        if let Some(existing) = self.states.get(workflow_id) {
            return Arc::clone(existing);
        }

        let mut aggregator = UpdateAggregator::new(
            workflow_id,
            self.config.terminal_stage().map(str::to_string),
        );
        for listener in &self.listeners {
            aggregator.add_listener(Arc::clone(listener));
        }

        let state = aggregator.shared();
        self.states
            .insert(workflow_id.to_string(), Arc::clone(&state));
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::StaticSnapshotLoader;
    use crate::state::AggregatedState;
    use crate::transport::{MockPeer, MockTransport};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use sw_protocol::{ConnectionState, WatchSettings, WorkflowStatus};
    use tokio::sync::mpsc;

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn client() -> (WorkflowClient, mpsc::UnboundedReceiver<MockPeer>) {
        let (transport, peers) = MockTransport::new();
        let config = ClientConfig::new(WatchSettings {
            terminal_stage: Some("final".to_string()),
            ..WatchSettings::default()
        });
        let client = WorkflowClient::new(
            config,
            Arc::new(transport),
            Arc::new(StaticSnapshotLoader::empty()),
        );
        (client, peers)
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_moves_to_connecting_then_running() {
        let (mut client, mut peers) = client();

        client.subscribe("wf-1").await.unwrap();
        assert!(client.is_subscribed());
        assert_eq!(client.workflow_id(), Some("wf-1"));

        let _peer = peers.recv().await.unwrap();
        settle().await;

        let view = client.state().await.unwrap();
        assert_eq!(view.workflow_status, WorkflowStatus::Running);
        assert!(view.is_connected);
    }

    #[tokio::test]
    async fn test_subscribe_rejects_empty_id() {
        let (mut client, _peers) = client();
        assert!(matches!(
            client.subscribe("").await,
            Err(ConnectionError::EmptyWorkflowId)
        ));
        assert!(!client.is_subscribed());
        assert!(client.state().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_same_id_is_noop() {
        let (mut client, mut peers) = client();

        client.subscribe("wf-1").await.unwrap();
        let _peer = peers.recv().await.unwrap();
        settle().await;

        client.subscribe("wf-1").await.unwrap();
        settle().await;

        assert!(peers.try_recv().is_err(), "no second connection expected");
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_workflows_keeps_old_state() {
        let (mut client, mut peers) = client();

        client.subscribe("wf-1").await.unwrap();
        let peer = peers.recv().await.unwrap();
        settle().await;
        peer.send_json(&json!({"type": "agent_update", "agent": "plan", "status": "completed", "result": "ok"}));
        settle().await;

        client.subscribe("wf-2").await.unwrap();
        let second = peers.recv().await.unwrap();
        assert_eq!(second.workflow_id(), "wf-2");
        settle().await;

        let old = client.state_for("wf-1").await.unwrap();
        assert_eq!(old.completed_agents, vec!["plan"]);
        assert_eq!(old.connection_state, ConnectionState::Closed);

        assert_eq!(client.get_result("plan").await, None);
        let current = client.state().await.unwrap();
        assert_eq!(current.workflow_id, "wf-2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_keeps_state() {
        let (mut client, mut peers) = client();

        client.subscribe("wf-1").await.unwrap();
        let peer = peers.recv().await.unwrap();
        settle().await;
        peer.send_json(&json!({"type": "agent_update", "agent": "plan", "status": "completed", "result": {"n": 1}}));
        settle().await;

        client.unsubscribe().await;

        assert!(!client.is_subscribed());
        assert_eq!(client.get_result("plan").await, Some(json!({"n": 1})));
        let view = client.state().await.unwrap();
        assert!(!view.is_connected);
        assert_eq!(view.workflow_status, WorkflowStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribe_continues_existing_state() {
        let (mut client, mut peers) = client();

        client.subscribe("wf-1").await.unwrap();
        let peer = peers.recv().await.unwrap();
        settle().await;
        peer.send_json(&json!({"type": "agent_update", "agent": "plan", "status": "completed"}));
        settle().await;
        client.unsubscribe().await;

        client.subscribe("wf-1").await.unwrap();
        let peer = peers.recv().await.unwrap();
        settle().await;
        peer.send_json(&json!({"type": "agent_update", "agent": "plan", "status": "completed"}));
        peer.send_json(&json!({"type": "agent_update", "agent": "build", "status": "completed"}));
        settle().await;

        let view = client.state().await.unwrap();
        assert_eq!(view.completed_agents, vec!["plan", "build"]);
        assert_eq!(view.agent_updates.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_status_without_connection_is_noop() {
        let (mut client, mut peers) = client();
        assert!(!client.request_status());

        client.subscribe("wf-1").await.unwrap();
        let mut peer = peers.recv().await.unwrap();
        settle().await;

        assert!(client.request_status());
        assert!(peer.recv_outbound().await.is_some());

        client.unsubscribe().await;
        assert!(!client.request_status());
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_change_reaches_existing_and_new_states() {
        let (mut client, mut peers) = client();
        let calls = Arc::new(AtomicUsize::new(0));

        client.subscribe("wf-1").await.unwrap();
        let _peer = peers.recv().await.unwrap();
        settle().await;

        let counter = Arc::clone(&calls);
        client
            .on_change(Arc::new(move |_: &AggregatedState| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .await;

        client.reset().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        client.subscribe("wf-2").await.unwrap();
        let _second = peers.recv().await.unwrap();
        settle().await;
        assert!(calls.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_bound_state() {
        let (mut client, mut peers) = client();

        client.subscribe("wf-1").await.unwrap();
        let peer = peers.recv().await.unwrap();
        settle().await;
        peer.send_json(&json!({"type": "agent_update", "agent": "plan", "status": "error", "error": "boom"}));
        settle().await;
        assert_eq!(
            client.state().await.unwrap().workflow_status,
            WorkflowStatus::Error
        );

        client.reset().await;

        let view = client.state().await.unwrap();
        assert_eq!(view.workflow_status, WorkflowStatus::Running);
        assert!(view.errors.is_empty());
        assert!(view.is_connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_after_reset_keep_workflow_running() {
        let (mut client, mut peers) = client();

        client.subscribe("wf-1").await.unwrap();
        let peer = peers.recv().await.unwrap();
        settle().await;
        client.reset().await;
        client.subscribe("wf-1").await.unwrap();

        peer.send_json(&json!({"type": "agent_update", "agent": "plan", "status": "running"}));
        peer.send_json(&json!({"type": "agent_update", "agent": "plan", "status": "completed"}));
        settle().await;

        let view = client.state().await.unwrap();
        assert_eq!(view.workflow_status, WorkflowStatus::Running);
        assert_eq!(view.completed_agents, vec!["plan"]);
        assert!(client.is_subscribed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_after_unsubscribe_returns_to_idle() {
        let (mut client, mut peers) = client();

        client.subscribe("wf-1").await.unwrap();
        let _peer = peers.recv().await.unwrap();
        settle().await;
        client.unsubscribe().await;
        client.reset().await;

        let view = client.state().await.unwrap();
        assert_eq!(view.workflow_status, WorkflowStatus::Idle);
        assert!(!view.is_connected);
    }
}
