//! Common test utilities shared by the integration tests.
//!
//! This module provides:
//! - Fixtures (configs, wire frames, snapshots, a scripted client harness)
//! - Custom assertions over workflow views and status histories

pub mod assertions;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
