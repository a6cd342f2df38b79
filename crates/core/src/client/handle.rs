//! A single live subscription.
//!
//! The handle owns a [`ConnectionManager`] and one dispatch task. The dispatch
//! task is the only writer of the aggregator while the subscription lives: it
//! drains the manager's event queue, drops stale generations, decodes frames
//! and fetches a snapshot after every successful open. A snapshot is merged
//! only while the connection attempt that requested it is still the latest.

use crate::codec;
use crate::connection::{
    ConnectionError, ConnectionEvent, ConnectionManager, ConnectionSettings, GenerationCounter,
    TaggedEvent,
};
use crate::snapshot::{InitialStateLoader, SnapshotError};
use crate::state::SharedAggregator;
use crate::transport::base::NORMAL_CLOSURE;
use crate::transport::Transport;
use std::sync::Arc;
use sw_protocol::{OutboundMessage, WorkflowSnapshot};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};

pub struct SubscriptionHandle {
    workflow_id: String,
    manager: ConnectionManager,
    state: SharedAggregator,
    dispatcher: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Open a subscription for `workflow_id` that feeds `state`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::EmptyWorkflowId` if `workflow_id` is empty.
    pub fn open(
        workflow_id: &str,
        transport: Arc<dyn Transport>,
        loader: Arc<dyn InitialStateLoader>,
        settings: ConnectionSettings,
        state: SharedAggregator,
    ) -> Result<Self, ConnectionError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut manager = ConnectionManager::new(transport, settings, events_tx);
        manager.open(workflow_id)?;

        let dispatcher = Dispatcher {
            workflow_id: workflow_id.to_string(),
            generation: manager.generation(),
            attempt: 0,
            state: Arc::clone(&state),
            loader,
            fetches: JoinSet::new(),
        };

        Ok(Self {
            workflow_id: workflow_id.to_string(),
            manager,
            state,
            dispatcher: tokio::spawn(dispatcher.run(events_rx)),
        })
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Whether the stream is currently open.
    pub fn is_open(&self) -> bool {
        self.manager.is_open()
    }

    /// Restart the connection task if it ended after a normal close.
    ///
    /// A no-op while the task is still running.
    pub fn ensure_open(&mut self) -> Result<(), ConnectionError> {
        self.manager.open(&self.workflow_id)
    }

    /// Ask the server for a status report. False when no stream is open.
    pub fn request_status(&self) -> bool {
        self.manager.send(OutboundMessage::Status)
    }

    /// Tear down the connection and the dispatch task.
    ///
    /// The aggregator keeps its state and records the connection as closed.
    pub async fn close(&mut self) {
        self.manager.close();
        self.dispatcher.abort();
        let mut state = self.state.lock().await;
        state.mark_unsubscribed();
        state.on_close(NORMAL_CLOSURE);
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

/// Generation, attempt and result of one snapshot fetch.
type FetchOutcome = (u64, u64, Result<WorkflowSnapshot, SnapshotError>);

struct Dispatcher {
    workflow_id: String,
    generation: GenerationCounter,
    /// Latest connection attempt seen in the current generation.
    attempt: u64,
    state: SharedAggregator,
    loader: Arc<dyn InitialStateLoader>,
    fetches: JoinSet<FetchOutcome>,
}

impl Dispatcher {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<TaggedEvent>) {
        loop {
            tokio::select! {
                tagged = events.recv() => match tagged {
                    Some(tagged) => self.apply(tagged).await,
                    None => break,
                },
                Some(joined) = self.fetches.join_next() => self.merge(joined).await,
            }
        }
        tracing::debug!(workflow_id = %self.workflow_id, "dispatcher stopped");
    }

    async fn apply(&mut self, tagged: TaggedEvent) {
        let TaggedEvent {
            generation,
            attempt,
            event,
        } = tagged;
        if !self.generation.is_current(generation) {
            tracing::debug!(workflow_id = %self.workflow_id, generation, "dropping stale event");
            return;
        }
        self.attempt = attempt;

        let opened = event == ConnectionEvent::Open;
        {
            let mut state = self.state.lock().await;
            match event {
                ConnectionEvent::Connecting => state.on_connecting(),
                ConnectionEvent::Open => state.on_open(),
                ConnectionEvent::Message(text) => match codec::parse_frame(&text) {
                    Ok(update) => state.ingest(update),
                    Err(e) => {
                        tracing::warn!(workflow_id = %self.workflow_id, error = %e, "dropping inbound frame");
                    }
                },
                ConnectionEvent::Error(description) => {
                    tracing::warn!(workflow_id = %self.workflow_id, error = %description, "transport error");
                    state.on_error();
                }
                ConnectionEvent::Closed(code) => state.on_close(code),
            }
        }

        if opened {
            let loader = Arc::clone(&self.loader);
            let workflow_id = self.workflow_id.clone();
            self.fetches
                .spawn(async move { (generation, attempt, loader.fetch(&workflow_id).await) });
        }
    }

    async fn merge(&mut self, joined: Result<FetchOutcome, JoinError>) {
        match joined {
            Ok((generation, attempt, _))
                if !self.generation.is_current(generation) || attempt != self.attempt =>
            {
                tracing::debug!(workflow_id = %self.workflow_id, generation, attempt, "dropping stale snapshot");
            }
            Ok((_, _, Ok(snapshot))) => self.state.lock().await.merge_snapshot(&snapshot),
            Ok((_, _, Err(e))) => {
                tracing::warn!(workflow_id = %self.workflow_id, error = %e, "snapshot fetch failed");
            }
            Err(e) => {
                tracing::warn!(workflow_id = %self.workflow_id, error = %e, "snapshot task failed");
            }
        }
    }
}
