//! Mock transport implementation for testing.
//!
//! Every accepted connection hands a [`MockPeer`] to the test, which plays the
//! server side: it pushes frames, closes or breaks the stream, and inspects
//! what the client sent.

use crate::transport::base::{Connection, Frame, Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use sw_protocol::OutboundMessage;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// What the next connection attempt does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Accept,
    Refuse(String),
}

/// Server side of one mock connection.
pub struct MockPeer {
    workflow_id: String,
    frames: mpsc::UnboundedSender<Result<Frame, TransportError>>,
    outbound: mpsc::Receiver<OutboundMessage>,
}

impl MockPeer {
    /// Workflow the client connected for.
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Push a raw text frame. Returns false once the client side is gone.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.frames.send(Ok(Frame::Text(text.into()))).is_ok()
    }

    /// Push a JSON value as a text frame.
    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        self.send_text(value.to_string())
    }

    /// Send a close frame with the given code.
    pub fn close(&self, code: u16) -> bool {
        self.frames.send(Ok(Frame::Close(Some(code)))).is_ok()
    }

    /// Break the stream with a transport error.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.frames
            .send(Err(TransportError::StreamError(reason.into())))
            .is_ok()
    }

    /// End the stream without a close frame, like a dropped TCP connection.
    pub fn drop_connection(self) {}

    /// Next message the client sent, if one is already queued.
    pub fn try_recv_outbound(&mut self) -> Option<OutboundMessage> {
        self.outbound.try_recv().ok()
    }

    /// Wait for the next message the client sends.
    pub async fn recv_outbound(&mut self) -> Option<OutboundMessage> {
        self.outbound.recv().await
    }
}

/// In-memory transport driven by a script of connect outcomes.
///
/// Attempts beyond the end of the script are accepted.
pub struct MockTransport {
    script: Mutex<VecDeque<ConnectOutcome>>,
    attempts: AtomicUsize,
    peers: mpsc::UnboundedSender<MockPeer>,
}

impl MockTransport {
    /// Create a transport that accepts every attempt.
    ///
    /// The receiver yields one [`MockPeer`] per accepted connection.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MockPeer>) {
        Self::with_script(Vec::new())
    }

    /// Create a transport whose first attempts follow `script`.
    pub fn with_script(
        script: Vec<ConnectOutcome>,
    ) -> (Self, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers, peers_rx) = mpsc::unbounded_channel();
        let transport = Self {
            script: Mutex::new(script.into()),
            attempts: AtomicUsize::new(0),
            peers,
        };
        (transport, peers_rx)
    }

    /// Append an outcome to the script.
    pub async fn push_outcome(&self, outcome: ConnectOutcome) {
        self.script.lock().await.push_back(outcome);
    }

    /// Number of connection attempts so far, accepted or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, workflow_id: &str) -> Result<Connection, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let outcome = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or(ConnectOutcome::Accept);

        if let ConnectOutcome::Refuse(reason) = outcome {
            return Err(TransportError::ConnectFailed(reason));
        }

        let (frames, frames_rx) = mpsc::unbounded_channel();
        let (outbound, outbound_rx) = mpsc::channel(16);
        let _ = self.peers.send(MockPeer {
            workflow_id: workflow_id.to_string(),
            frames,
            outbound: outbound_rx,
        });

        Ok(Connection {
            outbound,
            inbound: Box::pin(UnboundedReceiverStream::new(frames_rx)),
        })
    }
}
