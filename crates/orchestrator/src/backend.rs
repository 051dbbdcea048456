//! Seam between the orchestrator and the remote comparison service.

use async_trait::async_trait;
use redline_client::{CompareResponse, RemoteCompareApi, RemoteProgress};
use redline_core::types::TaskId;

/// A fault raised by a comparison backend, as opposed to a failure the
/// remote service itself reported inside a [`CompareResponse`].
///
/// The HTTP client never raises these — transport problems are folded
/// into the response shape at the client boundary. The distinction
/// matters for retry: a raised fault is re-raised by the orchestrator
/// for bounded retry, while a reported failure is terminal.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct BackendFault(pub String);

/// Remote comparison operations consumed by the orchestrator and poller.
#[async_trait]
pub trait CompareBackend: Send + Sync {
    /// Run the primary comparison. Blocks up to the backend's long
    /// timeout; triggers remote side effects exactly once per call.
    async fn compare(
        &self,
        original_url: &str,
        amendment_url: &str,
        task_id: TaskId,
    ) -> Result<CompareResponse, BackendFault>;

    /// Best-effort progress query; `None` on any failure.
    async fn fetch_progress(&self, task_id: TaskId) -> Option<RemoteProgress>;
}

#[async_trait]
impl CompareBackend for RemoteCompareApi {
    async fn compare(
        &self,
        original_url: &str,
        amendment_url: &str,
        task_id: TaskId,
    ) -> Result<CompareResponse, BackendFault> {
        Ok(RemoteCompareApi::compare(self, original_url, amendment_url, task_id).await)
    }

    async fn fetch_progress(&self, task_id: TaskId) -> Option<RemoteProgress> {
        RemoteCompareApi::fetch_progress(self, task_id).await
    }
}
