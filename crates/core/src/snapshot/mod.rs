//! One-shot workflow snapshot loading.
//!
//! The snapshot reconciles live state with whatever happened while the client
//! was disconnected.

pub mod base;
pub mod http;
pub mod mock;

pub use base::{InitialStateLoader, SnapshotError};
pub use http::HttpSnapshotLoader;
pub use mock::StaticSnapshotLoader;
