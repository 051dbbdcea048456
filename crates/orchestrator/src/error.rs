//! Error taxonomy for orchestration attempts.

use redline_core::error::{ResolveError, StoreError};
use redline_core::types::TaskId;

/// Failure of a single orchestration attempt.
///
/// Remote-reported business failures are not errors at this level: they
/// end the attempt with a terminal `failed` task and an `Ok` return.
/// Only the variants for which [`is_retryable`](Self::is_retryable) is
/// true are eligible for the bounded external retry.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The task does not exist in storage. Fatal, never retried.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// Another invocation is already driving this task id. Fatal to
    /// this invocation; the winning one proceeds undisturbed.
    #[error("task {0} is already being processed")]
    AlreadyRunning(TaskId),

    /// A document locator could not be resolved to a URL. The attempt
    /// is persisted as `failed`; not retried (the blob is absent, not
    /// transiently unavailable).
    #[error(transparent)]
    Blob(#[from] ResolveError),

    /// The durable store failed mid-attempt. Re-raised after a
    /// best-effort `failed` persist so the caller's retry policy can
    /// schedule another attempt.
    #[error(transparent)]
    Store(StoreError),

    /// The comparison backend raised a fault, as opposed to the remote
    /// service reporting a failure inside a normal response. Persisted
    /// as `failed`, then re-raised for bounded retry.
    #[error("comparison backend fault: {0}")]
    Backend(String),
}

impl OrchestratorError {
    /// Whether an external scheduler may retry the attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Backend(_))
    }
}

impl From<StoreError> for OrchestratorError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}
