//! HTTP snapshot loader.

use crate::snapshot::base::{InitialStateLoader, SnapshotError};
use async_trait::async_trait;
use std::time::Duration;
use sw_protocol::WorkflowSnapshot;

/// Upper bound for one snapshot request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Loads snapshots from `GET {base_url}/workflows/{workflow_id}/status`.
#[derive(Debug, Clone)]
pub struct HttpSnapshotLoader {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSnapshotLoader {
    /// Create a loader for the given API base URL, e.g. `http://localhost:8000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Snapshot URL for a workflow.
    pub fn snapshot_url(&self, workflow_id: &str) -> String {
        format!(
            "{}/workflows/{}/status",
            self.base_url.trim_end_matches('/'),
            workflow_id
        )
    }
}

#[async_trait]
impl InitialStateLoader for HttpSnapshotLoader {
    async fn fetch(&self, workflow_id: &str) -> Result<WorkflowSnapshot, SnapshotError> {
        let url = self.snapshot_url(workflow_id);

        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| SnapshotError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SnapshotError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<WorkflowSnapshot>()
            .await
            .map_err(|e| SnapshotError::Decode(e.to_string()))
    }
}
