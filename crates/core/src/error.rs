//! Error types shared across crate boundaries.

use crate::types::TaskId;

/// Errors surfaced by the durable task store collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No task record exists for the given id.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The underlying database failed or rejected the operation.
    #[error("database error: {0}")]
    Database(String),
}

/// Errors surfaced by the blob URL resolver collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The underlying object is missing or inaccessible.
    #[error("document {0} unavailable")]
    Unavailable(String),
}
