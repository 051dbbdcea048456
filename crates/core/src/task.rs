//! Task lifecycle status and the remote service's result payload.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a comparison task.
///
/// Transitions are monotonic within an attempt:
/// `Pending -> Processing -> {Completed, Failed}`. A `Failed` task may be
/// re-entered into `Processing` by a fresh attempt; no other backward
/// transition exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, not yet picked up by an orchestrator invocation.
    Pending,
    /// An attempt is in flight.
    Processing,
    /// Terminal: the remote service produced a full result.
    Completed,
    /// Terminal: the attempt ended with a diagnostic error message.
    Failed,
}

impl TaskStatus {
    /// Stable string form, as persisted in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Parse the persisted string form. `None` for unknown labels.
    pub fn parse(s: &str) -> Option<TaskStatus> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "processing" => Some(TaskStatus::Processing),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }

    /// Whether no further transitions follow within the same attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Whether a transition from `self` to `next` is permitted.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Processing)
                | (TaskStatus::Processing, TaskStatus::Completed)
                | (TaskStatus::Processing, TaskStatus::Failed)
                | (TaskStatus::Failed, TaskStatus::Processing)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result payload produced by the remote comparison service.
///
/// Stored as-is in the task record once the task completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    /// Section names/numbers that were modified by the amendment.
    pub sections_changed: Vec<String>,
    /// Topics/subjects affected by the changes.
    pub topics_touched: Vec<String>,
    /// Detailed summary of what changed between the contracts.
    pub summary_of_the_change: String,
}
