//! Connection manager for one workflow subscription.
//!
//! The `ConnectionManager` owns at most one background connection task. That
//! task connects through a [`Transport`], forwards everything it sees as
//! [`TaggedEvent`]s, pings on a fixed interval, and reconnects after a fixed
//! delay whenever the stream ends abnormally.
//!
//! Every `open`/`close` advances a generation counter. Events carry the
//! generation of the task that produced them, so a consumer can drop events
//! that arrive after the task was superseded. Within one generation, each
//! connection attempt gets its own number.

use crate::transport::base::{
    Connection, Frame, Transport, ABNORMAL_CLOSURE, NORMAL_CLOSURE, NO_STATUS_RECEIVED,
    PING_TIMEOUT_CLOSURE,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use sw_protocol::OutboundMessage;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, sleep_until, Instant, MissedTickBehavior};
use tokio_stream::StreamExt;

/// Timing knobs for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,

    /// Interval between liveness pings while open.
    pub ping_interval: Duration,

    /// Treat the stream as dead when nothing arrives this long after a ping.
    pub ping_ack_timeout: Option<Duration>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(3),
            ping_interval: Duration::from_secs(30),
            ping_ack_timeout: None,
        }
    }
}

/// Lifecycle and message callbacks emitted by the connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection attempt is starting.
    Connecting,
    /// The stream is open.
    Open,
    /// A raw text frame arrived.
    Message(String),
    /// The transport failed. Always followed by `Closed`.
    Error(String),
    /// The stream ended with the given close code.
    Closed(u16),
}

/// A [`ConnectionEvent`] stamped with the generation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedEvent {
    pub generation: u64,
    /// Connection attempt within the generation, starting at 1.
    pub attempt: u64,
    pub event: ConnectionEvent,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Workflow id must not be empty")]
    EmptyWorkflowId,
}

/// Shared, monotonically increasing connection generation.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter(Arc<AtomicU64>);

impl GenerationCounter {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Outbound sender of the live connection.
struct OutboundSlot {
    generation: u64,
    sender: mpsc::Sender<OutboundMessage>,
}

type SharedSlot = Arc<Mutex<Option<OutboundSlot>>>;

fn lock_slot(slot: &SharedSlot) -> MutexGuard<'_, Option<OutboundSlot>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ActiveConnection {
    workflow_id: String,
    task: JoinHandle<()>,
}

/// Owns the lifecycle of one logical stream subscription.
///
/// `open` spawns onto the current tokio runtime, so it must be called from
/// within one.
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    settings: ConnectionSettings,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    generation: GenerationCounter,
    outbound: SharedSlot,
    active: Option<ActiveConnection>,
}

impl ConnectionManager {
    /// Create a manager that reports to `events_tx`.
    ///
    /// # Arguments
    ///
    /// * `transport` - Backend used for every connection attempt
    /// * `settings` - Reconnect and ping timing
    /// * `events_tx` - Receives every event, tagged with its generation
    pub fn new(
        transport: Arc<dyn Transport>,
        settings: ConnectionSettings,
        events_tx: mpsc::UnboundedSender<TaggedEvent>,
    ) -> Self {
        Self {
            transport,
            settings,
            events_tx,
            generation: GenerationCounter::default(),
            outbound: Arc::new(Mutex::new(None)),
            active: None,
        }
    }

    /// Handle on the generation counter, for filtering stale events.
    pub fn generation(&self) -> GenerationCounter {
        self.generation.clone()
    }

    /// Workflow of the current connection task, if one is running.
    pub fn workflow_id(&self) -> Option<&str> {
        self.active
            .as_ref()
            .filter(|active| !active.task.is_finished())
            .map(|active| active.workflow_id.as_str())
    }

    /// Whether a stream is currently open and writable.
    pub fn is_open(&self) -> bool {
        lock_slot(&self.outbound)
            .as_ref()
            .is_some_and(|slot| self.generation.is_current(slot.generation))
    }

    /// Start the connection task for `workflow_id`.
    ///
    /// A no-op when a task for the same workflow is still running. A task for
    /// another workflow is closed first.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::EmptyWorkflowId` if `workflow_id` is empty.
    pub fn open(&mut self, workflow_id: &str) -> Result<(), ConnectionError> {
        if workflow_id.is_empty() {
            return Err(ConnectionError::EmptyWorkflowId);
        }

        if self.workflow_id() == Some(workflow_id) {
            tracing::debug!(workflow_id, "connection already active");
            return Ok(());
        }

        self.close();

        let generation = self.generation.advance();
        tracing::info!(workflow_id, generation, "opening workflow stream");

        let task = ConnectionTask {
            workflow_id: workflow_id.to_string(),
            generation,
            current: self.generation.clone(),
            transport: Arc::clone(&self.transport),
            settings: self.settings,
            events_tx: self.events_tx.clone(),
            outbound: Arc::clone(&self.outbound),
        };

        self.active = Some(ActiveConnection {
            workflow_id: workflow_id.to_string(),
            task: tokio::spawn(task.run()),
        });
        Ok(())
    }

    /// Tear down the connection task.
    ///
    /// Cancels any pending reconnect and ping timer. Events still in flight
    /// from the old task become stale.
    pub fn close(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        active.task.abort();
        let generation = self.generation.advance();
        lock_slot(&self.outbound).take();
        tracing::info!(workflow_id = %active.workflow_id, generation, "closed workflow stream");
    }

    /// Queue a message on the open stream.
    ///
    /// Returns false when no stream is open or its buffer is full.
    pub fn send(&self, message: OutboundMessage) -> bool {
        match lock_slot(&self.outbound).as_ref() {
            Some(slot) if self.generation.is_current(slot.generation) => {
                slot.sender.try_send(message).is_ok()
            }
            _ => false,
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// State owned by one spawned connection loop.
struct ConnectionTask {
    workflow_id: String,
    generation: u64,
    current: GenerationCounter,
    transport: Arc<dyn Transport>,
    settings: ConnectionSettings,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    outbound: SharedSlot,
}

impl ConnectionTask {
    /// Emit an event. False once nobody is listening anymore.
    fn emit(&self, attempt: u64, event: ConnectionEvent) -> bool {
        self.events_tx
            .send(TaggedEvent {
                generation: self.generation,
                attempt,
                event,
            })
            .is_ok()
    }

    async fn run(self) {
        let mut attempt = 0;
        loop {
            attempt += 1;
            if !self.emit(attempt, ConnectionEvent::Connecting) {
                return;
            }

            let code = match self.transport.connect(&self.workflow_id).await {
                Ok(connection) => self.pump(attempt, connection).await,
                Err(e) => {
                    tracing::warn!(workflow_id = %self.workflow_id, attempt, error = %e, "connection attempt failed");
                    self.emit(attempt, ConnectionEvent::Error(e.to_string()));
                    ABNORMAL_CLOSURE
                }
            };

            self.release_outbound();
            if !self.emit(attempt, ConnectionEvent::Closed(code)) {
                return;
            }

            if code == NORMAL_CLOSURE {
                tracing::info!(workflow_id = %self.workflow_id, "stream closed normally");
                return;
            }

            tracing::debug!(
                workflow_id = %self.workflow_id,
                code,
                delay_ms = self.settings.reconnect_delay.as_millis(),
                "scheduling reconnect"
            );
            sleep(self.settings.reconnect_delay).await;
        }
    }

    /// Drive an open connection until it ends. Returns the close code.
    async fn pump(&self, attempt: u64, connection: Connection) -> u16 {
        let Connection {
            outbound,
            mut inbound,
        } = connection;

        {
            let mut slot = lock_slot(&self.outbound);
            if self.current.is_current(self.generation) {
                *slot = Some(OutboundSlot {
                    generation: self.generation,
                    sender: outbound.clone(),
                });
            }
        }

        if !self.emit(attempt, ConnectionEvent::Open) {
            return NORMAL_CLOSURE;
        }

        let period = self.settings.ping_interval;
        let mut ping = interval_at(Instant::now() + period, period);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ack_deadline: Option<Instant> = None;

        loop {
            let ack_timer = async move {
                match ack_deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                frame = inbound.next() => match frame {
                    Some(Ok(Frame::Text(text))) => {
                        ack_deadline = None;
                        if !self.emit(attempt, ConnectionEvent::Message(text)) {
                            return NORMAL_CLOSURE;
                        }
                    }
                    Some(Ok(Frame::Close(code))) => return code.unwrap_or(NO_STATUS_RECEIVED),
                    Some(Err(e)) => {
                        tracing::warn!(workflow_id = %self.workflow_id, error = %e, "stream failed");
                        self.emit(attempt, ConnectionEvent::Error(e.to_string()));
                        return ABNORMAL_CLOSURE;
                    }
                    None => return ABNORMAL_CLOSURE,
                },
                _ = ping.tick() => {
                    if outbound.try_send(OutboundMessage::Ping).is_err() {
                        tracing::debug!(workflow_id = %self.workflow_id, "ping not sent");
                    }
                    if ack_deadline.is_none() {
                        ack_deadline = self.settings.ping_ack_timeout.map(|timeout| Instant::now() + timeout);
                    }
                }
                () = ack_timer => {
                    tracing::warn!(workflow_id = %self.workflow_id, "ping went unanswered");
                    return PING_TIMEOUT_CLOSURE;
                }
            }
        }
    }

    fn release_outbound(&self) {
        let mut slot = lock_slot(&self.outbound);
        if slot
            .as_ref()
            .is_some_and(|current| current.generation == self.generation)
        {
            slot.take();
        }
    }
}
