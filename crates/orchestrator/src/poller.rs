//! Concurrent progress polling scoped to one orchestration attempt.
//!
//! The poller relays remote-side progress into the broadcaster on a
//! fixed cadence. Poll failures are absorbed here: a slow or flaky
//! progress endpoint never delays or fails the primary compare call —
//! only the coarse-grained compare result is authoritative.

use std::sync::Arc;
use std::time::Duration;

use redline_core::types::TaskId;
use redline_events::{ProgressBroadcaster, ProgressEvent};
use tokio_util::sync::CancellationToken;

use crate::backend::CompareBackend;

/// Handle to a running poller task.
///
/// The owning attempt must call [`stop`](Self::stop) before it returns,
/// on every exit path. Dropping the handle cancels the loop as a
/// backstop, without waiting for it to finish.
pub(crate) struct PollerHandle {
    cancel: CancellationToken,
    join: tokio::task::JoinHandle<()>,
}

impl PollerHandle {
    /// Spawn the polling loop for one task attempt.
    pub fn spawn(
        backend: Arc<dyn CompareBackend>,
        broadcaster: Arc<ProgressBroadcaster>,
        task_id: TaskId,
        interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let join = tokio::spawn(async move {
            poll_loop(backend, broadcaster, task_id, interval, token).await;
        });
        Self { cancel, join }
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        let _ = (&mut self.join).await;
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Poll remote progress until cancelled, publishing each changed value.
///
/// The per-call timeout lives in the backend and is shorter than the
/// cadence, so cancellation between iterations never leaves a query in
/// flight for long.
async fn poll_loop(
    backend: Arc<dyn CompareBackend>,
    broadcaster: Arc<ProgressBroadcaster>,
    task_id: TaskId,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut last_relayed: Option<u8> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(%task_id, "Progress poller stopped");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        let progress = tokio::select! {
            _ = cancel.cancelled() => return,
            progress = backend.fetch_progress(task_id) => progress,
        };

        match progress {
            Some(remote) if last_relayed != Some(remote.progress) => {
                last_relayed = Some(remote.progress);
                broadcaster
                    .publish(ProgressEvent {
                        task_id,
                        status: remote.status,
                        progress: remote.progress,
                        message: remote.message,
                        step: remote.step,
                    })
                    .await;
            }
            Some(_) => {} // unchanged since last relay
            None => {
                tracing::debug!(%task_id, "Progress unavailable, will poll again");
            }
        }
    }
}
