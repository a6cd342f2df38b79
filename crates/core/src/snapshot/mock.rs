//! Static snapshot loader for tests and offline use.

use crate::snapshot::base::{InitialStateLoader, SnapshotError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use sw_protocol::WorkflowSnapshot;
use tokio::sync::Mutex;

/// Returns a fixed snapshot (or error) and counts how often it was asked.
pub struct StaticSnapshotLoader {
    response: Mutex<Result<WorkflowSnapshot, SnapshotError>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl StaticSnapshotLoader {
    pub fn new(snapshot: WorkflowSnapshot) -> Self {
        Self {
            response: Mutex::new(Ok(snapshot)),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// A loader that knows nothing about any workflow.
    pub fn empty() -> Self {
        Self::new(WorkflowSnapshot::default())
    }

    /// A loader whose every fetch fails.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            response: Mutex::new(Err(SnapshotError::Request(reason.into()))),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Answer each fetch only after `delay`.
    ///
    /// The response is taken when the fetch starts, like a server that
    /// answers slowly with what it knew at request time.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the response returned by later fetches.
    pub async fn set_response(&self, response: Result<WorkflowSnapshot, SnapshotError>) {
        *self.response.lock().await = response;
    }

    /// Number of fetches so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InitialStateLoader for StaticSnapshotLoader {
    async fn fetch(&self, _workflow_id: &str) -> Result<WorkflowSnapshot, SnapshotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.response.lock().await.clone();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        response
    }
}
