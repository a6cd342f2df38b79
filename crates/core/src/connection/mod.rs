//! Stream connection lifecycle: connect, ping, reconnect, cancel.

pub mod manager;

pub use manager::{
    ConnectionError, ConnectionEvent, ConnectionManager, ConnectionSettings, GenerationCounter,
    TaggedEvent,
};
