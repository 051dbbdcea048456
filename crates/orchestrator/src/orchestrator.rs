//! The task lifecycle state machine.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use redline_core::retry::RetryPolicy;
use redline_core::task::TaskStatus;
use redline_core::types::TaskId;
use redline_db::models::ComparisonTask;
use redline_events::{ProgressBroadcaster, ProgressEvent};
use tokio::sync::Mutex;

use crate::backend::CompareBackend;
use crate::error::OrchestratorError;
use crate::poller::PollerHandle;
use crate::resolver::UrlResolver;
use crate::store::TaskStore;

/// How often the poller queries remote progress.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// TTL requested for resolved document URLs. Must outlast the compare
/// timeout so the remote service can still fetch the documents late in
/// a slow run.
const DEFAULT_URL_TTL: Duration = Duration::from_secs(600);

/// Drives comparison tasks from `pending` to a terminal status.
///
/// One instance is shared across the worker pool; per-task-id mutual
/// exclusion lives in the `active` set, with the store's conditional
/// `begin_processing` update as the durable arbiter.
pub struct Orchestrator {
    store: Arc<dyn TaskStore>,
    resolver: Arc<dyn UrlResolver>,
    backend: Arc<dyn CompareBackend>,
    broadcaster: Arc<ProgressBroadcaster>,
    /// Task ids with an in-flight attempt in this process.
    active: Mutex<HashSet<TaskId>>,
    poll_interval: Duration,
    url_ttl: Duration,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn TaskStore>,
        resolver: Arc<dyn UrlResolver>,
        backend: Arc<dyn CompareBackend>,
        broadcaster: Arc<ProgressBroadcaster>,
    ) -> Self {
        Self {
            store,
            resolver,
            backend,
            broadcaster,
            active: Mutex::new(HashSet::new()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            url_ttl: DEFAULT_URL_TTL,
        }
    }

    /// Override the poll cadence (tests use a short interval).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the TTL requested for resolved document URLs.
    pub fn with_url_ttl(mut self, ttl: Duration) -> Self {
        self.url_ttl = ttl;
        self
    }

    /// Subscribe to progress events for a task.
    ///
    /// Exposed so the presentation layer can attach observers without
    /// reaching into the broadcaster directly.
    pub async fn subscribe(
        &self,
        task_id: TaskId,
    ) -> tokio::sync::broadcast::Receiver<ProgressEvent> {
        self.broadcaster.subscribe(task_id).await
    }

    /// Run one processing attempt for a task.
    ///
    /// Transitions the task durably into `processing` before any remote
    /// call, runs the compare with the progress poller alive exactly as
    /// long as the call, and persists the terminal status before the
    /// terminal event is published. Returns the terminal status, or an
    /// error when the attempt could not produce one ([`OrchestratorError`]
    /// documents which of those the caller may retry).
    pub async fn run(&self, task_id: TaskId) -> Result<TaskStatus, OrchestratorError> {
        {
            let mut active = self.active.lock().await;
            if !active.insert(task_id) {
                return Err(OrchestratorError::AlreadyRunning(task_id));
            }
        }

        let outcome = self.attempt(task_id).await;
        self.active.lock().await.remove(&task_id);
        outcome
    }

    /// Run a task under the bounded retry policy.
    ///
    /// Retries only faults re-raised by [`run`](Self::run) — never a
    /// remote-reported business failure, which is already a terminal
    /// `failed`. Attempts for one task id are serialized by construction:
    /// the next attempt starts only after the previous one returned.
    pub async fn run_with_retry(
        &self,
        task_id: TaskId,
        policy: &RetryPolicy,
    ) -> Result<TaskStatus, OrchestratorError> {
        let mut attempt = 1u32;
        loop {
            match self.run(task_id).await {
                Ok(status) => return Ok(status),
                Err(e) if e.is_retryable() && policy.allows_another(attempt) => {
                    tracing::warn!(
                        %task_id,
                        attempt,
                        error = %e,
                        "Attempt failed, retrying after delay",
                    );
                    tokio::time::sleep(policy.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ---- attempt internals ----

    async fn attempt(&self, task_id: TaskId) -> Result<TaskStatus, OrchestratorError> {
        let task = self.store.load(task_id).await?;

        // Durable transition first: a crash after this point shows up as
        // a stuck `processing` task, a detectable condition, rather than
        // a silently lost one.
        if !self.store.begin_processing(task_id).await? {
            return Err(OrchestratorError::AlreadyRunning(task_id));
        }

        tracing::info!(%task_id, "Task processing started");
        self.broadcaster
            .publish(ProgressEvent::starting(task_id))
            .await;

        let (original_url, amendment_url) = match self.resolve_inputs(&task).await {
            Ok(urls) => urls,
            Err(e) => {
                let message = e.to_string();
                self.persist_failure(task_id, &message, None).await;
                return Err(e.into());
            }
        };

        // The poller lives exactly as long as the compare call and is
        // stopped on every exit path before this attempt returns.
        let poller = PollerHandle::spawn(
            Arc::clone(&self.backend),
            Arc::clone(&self.broadcaster),
            task_id,
            self.poll_interval,
        );
        let outcome = self
            .backend
            .compare(&original_url, &amendment_url, task_id)
            .await;
        poller.stop().await;

        let response = match outcome {
            Ok(response) => response,
            Err(fault) => {
                tracing::error!(%task_id, error = %fault, "Attempt faulted in compare backend");
                self.persist_failure(task_id, &fault.to_string(), None).await;
                return Err(OrchestratorError::Backend(fault.to_string()));
            }
        };

        let success = response.is_success();
        let trace_id = response.trace_id.clone();
        match response.result {
            Some(result) if success => {
                if let Err(e) = self
                    .store
                    .complete(
                        task_id,
                        &result,
                        trace_id.as_deref(),
                        response.processing_time_ms,
                    )
                    .await
                {
                    self.persist_failure(task_id, &e.to_string(), trace_id.as_deref())
                        .await;
                    return Err(e.into());
                }

                tracing::info!(
                    %task_id,
                    trace_id = trace_id.as_deref().unwrap_or("-"),
                    processing_time_ms = response.processing_time_ms,
                    "Task completed",
                );
                self.broadcaster
                    .publish(ProgressEvent::completed(task_id))
                    .await;
                self.broadcaster.forget(task_id).await;
                Ok(TaskStatus::Completed)
            }
            _ => {
                // The remote service reported a failure (or an unusable
                // success). Terminal for the task; not an attempt fault.
                let message = response.error_text();
                tracing::warn!(%task_id, error = %message, "Remote service reported failure");
                self.store
                    .fail(task_id, &message, trace_id.as_deref())
                    .await?;
                self.broadcaster
                    .publish(ProgressEvent::failed(task_id, &message))
                    .await;
                self.broadcaster.forget(task_id).await;
                Ok(TaskStatus::Failed)
            }
        }
    }

    async fn resolve_inputs(
        &self,
        task: &ComparisonTask,
    ) -> Result<(String, String), redline_core::error::ResolveError> {
        let original = self
            .resolver
            .resolve(&task.original_ref, self.url_ttl)
            .await?;
        let amendment = self
            .resolver
            .resolve(&task.amendment_ref, self.url_ttl)
            .await?;
        Ok((original, amendment))
    }

    /// Best-effort terminal failure on a fault path: persist first, then
    /// publish, so an observer reacting to the terminal event always
    /// reads terminal state. A failing persist is logged, not raised —
    /// the original fault is the one the caller needs to see.
    async fn persist_failure(&self, task_id: TaskId, message: &str, trace_id: Option<&str>) {
        if let Err(e) = self.store.fail(task_id, message, trace_id).await {
            tracing::error!(%task_id, error = %e, "Failed to persist failure state");
        }
        self.broadcaster
            .publish(ProgressEvent::failed(task_id, message))
            .await;
        self.broadcaster.forget(task_id).await;
    }
}
