//! Base Transport trait and supporting types.

use async_trait::async_trait;
use std::pin::Pin;
use sw_protocol::OutboundMessage;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// Close code for a normal, intentional closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when a close frame carries no status.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Close code reported when the stream ends without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close code used locally when a ping goes unanswered past the ack timeout.
pub const PING_TIMEOUT_CLOSURE: u16 = 4000;

/// A frame received from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text message, expected to hold one JSON object.
    Text(String),
    /// The peer closed the stream, with its close code if it sent one.
    Close(Option<u16>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectFailed(String),
    #[error("Stream error: {0}")]
    StreamError(String),
}

/// Inbound half of a connection.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// An established stream connection.
///
/// Dropping both halves closes the connection.
pub struct Connection {
    /// Messages queued here are serialized and written to the stream.
    pub outbound: mpsc::Sender<OutboundMessage>,
    /// Frames read from the stream. Ends when the connection is gone.
    pub inbound: FrameStream,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, workflow_id: &str) -> Result<Connection, TransportError>;
}
