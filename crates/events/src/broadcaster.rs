//! Per-task progress fan-out backed by `tokio::sync::broadcast` channels.
//!
//! [`ProgressBroadcaster`] is the publish/subscribe hub between the
//! progress poller and any number of live observers. Channels are keyed
//! by task id and created lazily on first subscription. It is designed
//! to be shared via `Arc<ProgressBroadcaster>` across the application.

use std::collections::HashMap;

use redline_core::types::TaskId;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

/// Buffer capacity of each per-task broadcast channel.
///
/// When the buffer is full the oldest un-consumed events are dropped and
/// slow receivers observe `RecvError::Lagged` — acceptable under the
/// at-most-once delivery contract.
const CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// ProgressEvent
// ---------------------------------------------------------------------------

/// A progress update for one comparison task.
///
/// Ephemeral: published to currently connected subscribers and never
/// stored. Subscribers that attach later simply miss earlier events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Task the update belongs to.
    pub task_id: TaskId,

    /// Status label as reported by the remote service. Not necessarily
    /// equal to the task's persisted status.
    pub status: String,

    /// Completion percentage (0-100). Expected, but not guaranteed, to
    /// be non-decreasing.
    pub progress: u8,

    /// Human-readable description of the current stage.
    pub message: String,

    /// Pipeline step label, when the remote service reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

impl ProgressEvent {
    /// Event emitted when an attempt enters `processing`, before any
    /// remote call, so freshly attached observers see liveness.
    pub fn starting(task_id: TaskId) -> Self {
        Self {
            task_id,
            status: "processing".to_string(),
            progress: 0,
            message: "starting".to_string(),
            step: None,
        }
    }

    /// Terminal event published after a successful result is persisted.
    pub fn completed(task_id: TaskId) -> Self {
        Self {
            task_id,
            status: "completed".to_string(),
            progress: 100,
            message: "processing complete".to_string(),
            step: None,
        }
    }

    /// Terminal event published after a failure is persisted.
    pub fn failed(task_id: TaskId, error: &str) -> Self {
        Self {
            task_id,
            status: "failed".to_string(),
            progress: 100,
            message: format!("processing failed: {error}"),
            step: None,
        }
    }

    /// Whether this event closes the stream for its task.
    pub fn is_terminal(&self) -> bool {
        self.status == "completed" || self.status == "failed"
    }
}

// ---------------------------------------------------------------------------
// ProgressBroadcaster
// ---------------------------------------------------------------------------

/// In-process fan-out registry keyed by task id.
///
/// Every subscriber of a task id independently receives each event
/// published for that id, in publish order. Publishing to an id with no
/// subscribers is a no-op.
pub struct ProgressBroadcaster {
    channels: RwLock<HashMap<TaskId, broadcast::Sender<ProgressEvent>>>,
}

impl ProgressBroadcaster {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to events for one task id.
    ///
    /// Creates the channel on first use. The receiver yields events
    /// published after this call until the channel is dropped via
    /// [`forget`](Self::forget).
    pub async fn subscribe(&self, task_id: TaskId) -> broadcast::Receiver<ProgressEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(task_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to all current subscribers of its task id.
    ///
    /// Zero subscribers (no channel, or a channel whose receivers all
    /// detached) is not an error.
    pub async fn publish(&self, event: ProgressEvent) {
        let channels = self.channels.read().await;
        if let Some(sender) = channels.get(&event.task_id) {
            // Ignore the SendError — it only means there are zero receivers.
            let _ = sender.send(event);
        }
    }

    /// Drop the channel for a task.
    ///
    /// Called after the terminal event has been published so the registry
    /// does not grow with finished tasks. Existing receivers drain any
    /// buffered events and then observe a closed channel.
    pub async fn forget(&self, task_id: TaskId) {
        self.channels.write().await.remove(&task_id);
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
