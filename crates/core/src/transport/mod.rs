//! Transport layer for the workflow event stream.
//!
//! This module provides:
//! - The `Transport` trait every stream backend implements
//! - A WebSocket implementation on top of `tokio-tungstenite`
//! - A scriptable in-memory transport for tests

pub mod base;
pub mod mock;
pub mod websocket;

pub use base::{Connection, Frame, FrameStream, Transport, TransportError};
pub use mock::{ConnectOutcome, MockPeer, MockTransport};
pub use websocket::WebSocketTransport;
