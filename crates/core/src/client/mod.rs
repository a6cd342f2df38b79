//! Consumer-facing workflow client.
//!
//! This module provides:
//! - `SubscriptionHandle`: one live subscription (connection plus dispatch task)
//! - `WorkflowClient`: read-only state access plus subscribe/unsubscribe

pub mod handle;
pub mod workflow_client;

pub use handle::SubscriptionHandle;
pub use workflow_client::WorkflowClient;
