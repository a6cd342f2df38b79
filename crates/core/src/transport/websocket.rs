//! WebSocket transport over `tokio-tungstenite`.
//!
//! Each connection spawns one writer task that owns the sink half. The
//! writer serializes outbound messages, and sends a normal (1000) close frame
//! once every outbound sender has been dropped.

use crate::transport::base::{Connection, Frame, Transport, TransportError};
use async_stream::stream;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use sw_protocol::OutboundMessage;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// Outbound messages buffered per connection before `try_send` starts failing.
const OUTBOUND_BUFFER: usize = 16;

/// Connects to `{base_url}/ws/{workflow_id}`.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    base_url: String,
}

impl WebSocketTransport {
    /// Create a transport for the given base URL, e.g. `ws://localhost:8000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Stream URL for a workflow.
    pub fn stream_url(&self, workflow_id: &str) -> String {
        format!("{}/ws/{}", self.base_url.trim_end_matches('/'), workflow_id)
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, workflow_id: &str) -> Result<Connection, TransportError> {
        let url = self.stream_url(workflow_id);
        let (ws, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::ConnectFailed(format!("{url}: {e}")))?;
        tracing::debug!(%url, "websocket connected");

        let (mut sink, mut source) = ws.split();
        let (outbound, mut outbound_rx) = mpsc::channel::<OutboundMessage>(OUTBOUND_BUFFER);

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode outbound message");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    tracing::debug!(error = %e, "websocket write failed");
                    return;
                }
            }
            let close = CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            };
            if let Err(e) = sink.send(Message::Close(Some(close))).await {
                tracing::debug!(error = %e, "websocket close failed");
            }
        });

        let inbound = stream! {
            while let Some(item) = source.next().await {
                match item {
                    Ok(Message::Text(text)) => yield Ok(Frame::Text(text.as_str().to_owned())),
                    Ok(Message::Close(frame)) => {
                        yield Ok(Frame::Close(frame.map(|f| u16::from(f.code))));
                        break;
                    }
                    // Binary frames carry nothing we understand; control
                    // frames are answered by tungstenite itself.
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(TransportError::StreamError(e.to_string()));
                        break;
                    }
                }
            }
        };

        Ok(Connection {
            outbound,
            inbound: Box::pin(inbound),
        })
    }
}
