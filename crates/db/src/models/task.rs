//! Comparison task entity model.

use redline_core::task::TaskStatus;
use redline_core::types::{TaskId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A durable comparison task record.
///
/// Invariants maintained by [`TaskRepo`](crate::repositories::TaskRepo):
/// `result` is set iff `status` is `completed`; `error_message` is set
/// iff `status` is `failed`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ComparisonTask {
    pub id: TaskId,
    /// Lifecycle status; one of `pending`, `processing`, `completed`,
    /// `failed`.
    pub status: String,
    /// Opaque locator of the original contract document.
    pub original_ref: String,
    /// Opaque locator of the amendment document.
    pub amendment_ref: String,
    /// Result payload from the remote service.
    pub result: Option<serde_json::Value>,
    /// Remote observability correlation id.
    pub trace_id: Option<String>,
    /// Remote-side processing duration.
    pub processing_time_ms: Option<i64>,
    /// Diagnostic message for a failed task.
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl ComparisonTask {
    /// Parsed lifecycle status. `None` only if the row carries a label
    /// outside the CHECK-constrained set.
    pub fn task_status(&self) -> Option<TaskStatus> {
        TaskStatus::parse(&self.status)
    }
}
