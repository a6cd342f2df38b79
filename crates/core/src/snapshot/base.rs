//! Snapshot loader trait and errors.

use async_trait::async_trait;
use sw_protocol::WorkflowSnapshot;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Snapshot request failed: {0}")]
    Request(String),
    #[error("Snapshot endpoint {url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("Invalid snapshot body: {0}")]
    Decode(String),
}

/// Fetches what the server already knows about a workflow.
#[async_trait]
pub trait InitialStateLoader: Send + Sync {
    async fn fetch(&self, workflow_id: &str) -> Result<WorkflowSnapshot, SnapshotError>;
}
