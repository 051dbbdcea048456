//! End-to-end attempt scenarios against stub collaborators.
//!
//! Exercises the full lifecycle: pending -> processing -> terminal,
//! progress relay ordering, poller shutdown, retry bounds, and the
//! one-invocation-per-task rule.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::Utc;
use redline_client::{CompareResponse, RemoteProgress};
use redline_core::error::StoreError;
use redline_core::retry::RetryPolicy;
use redline_core::task::{ComparisonOutcome, TaskStatus};
use redline_core::types::TaskId;
use redline_db::models::ComparisonTask;
use redline_events::ProgressBroadcaster;
use redline_orchestrator::{
    BackendFault, CompareBackend, Orchestrator, OrchestratorError, PassthroughResolver, TaskStore,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Stub collaborators
// ---------------------------------------------------------------------------

/// In-memory task store mirroring the repository's transition rules.
struct MemoryStore {
    tasks: Mutex<HashMap<TaskId, ComparisonTask>>,
}

impl MemoryStore {
    fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }

    async fn insert_pending(&self, original_ref: &str, amendment_ref: &str) -> TaskId {
        let id = TaskId::new_v4();
        let now = Utc::now();
        let task = ComparisonTask {
            id,
            status: "pending".to_string(),
            original_ref: original_ref.to_string(),
            amendment_ref: amendment_ref.to_string(),
            result: None,
            trace_id: None,
            processing_time_ms: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        self.tasks.lock().await.insert(id, task);
        id
    }

    async fn get(&self, id: TaskId) -> ComparisonTask {
        self.tasks
            .lock()
            .await
            .get(&id)
            .expect("task exists")
            .clone()
    }

    async fn set_status(&self, id: TaskId, status: &str) {
        self.tasks
            .lock()
            .await
            .get_mut(&id)
            .expect("task exists")
            .status = status.to_string();
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn load(&self, id: TaskId) -> Result<ComparisonTask, StoreError> {
        self.tasks
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn begin_processing(&self, id: TaskId) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if task.status == "pending" || task.status == "failed" {
            task.status = "processing".to_string();
            task.error_message = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn complete(
        &self,
        id: TaskId,
        result: &ComparisonOutcome,
        trace_id: Option<&str>,
        processing_time_ms: Option<i64>,
    ) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        task.status = "completed".to_string();
        task.result = Some(serde_json::to_value(result).expect("serializable"));
        task.trace_id = trace_id.map(str::to_string);
        task.processing_time_ms = processing_time_ms;
        task.error_message = None;
        task.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn fail(
        &self,
        id: TaskId,
        error_message: &str,
        trace_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        task.status = "failed".to_string();
        task.error_message = Some(error_message.to_string());
        task.trace_id = trace_id.map(str::to_string);
        task.result = None;
        task.completed_at = Some(Utc::now());
        Ok(())
    }
}

/// Backend stub: scripted compare outcomes (one per call, last repeats)
/// and a progress sequence that advances one step per poll.
struct StubBackend {
    compare_delay: Duration,
    compare_script: Mutex<VecDeque<Result<CompareResponse, BackendFault>>>,
    compare_calls: AtomicU32,
    progress_sequence: Vec<u8>,
    progress_calls: AtomicU32,
}

impl StubBackend {
    fn new(
        compare_delay: Duration,
        script: Vec<Result<CompareResponse, BackendFault>>,
        progress_sequence: Vec<u8>,
    ) -> Self {
        Self {
            compare_delay,
            compare_script: Mutex::new(script.into_iter().collect()),
            compare_calls: AtomicU32::new(0),
            progress_sequence,
            progress_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl CompareBackend for StubBackend {
    async fn compare(
        &self,
        _original_url: &str,
        _amendment_url: &str,
        _task_id: TaskId,
    ) -> Result<CompareResponse, BackendFault> {
        self.compare_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.compare_delay).await;
        let mut script = self.compare_script.lock().await;
        if script.len() > 1 {
            script.pop_front().expect("non-empty script")
        } else {
            script
                .front()
                .expect("non-empty script")
                .as_ref()
                .map(Clone::clone)
                .map_err(|e| BackendFault(e.0.clone()))
        }
    }

    async fn fetch_progress(&self, _task_id: TaskId) -> Option<RemoteProgress> {
        if self.progress_sequence.is_empty() {
            self.progress_calls.fetch_add(1, Ordering::SeqCst);
            return None;
        }
        let call = self.progress_calls.fetch_add(1, Ordering::SeqCst) as usize;
        let index = call.min(self.progress_sequence.len() - 1);
        let progress = self.progress_sequence[index];
        Some(RemoteProgress {
            status: "processing".to_string(),
            progress,
            step: Some(format!("Step {}/5", index + 1)),
            message: format!("at {progress}%"),
        })
    }
}

fn success_response() -> CompareResponse {
    serde_json::from_value(serde_json::json!({
        "status": "success",
        "result": {
            "sections_changed": ["3.1"],
            "topics_touched": ["payment terms"],
            "summary_of_the_change": "Payment window extended from 30 to 45 days."
        },
        "trace_id": "t-1",
        "processing_time_ms": 1200
    }))
    .expect("valid fixture")
}

fn error_response(message: &str) -> CompareResponse {
    serde_json::from_value(serde_json::json!({
        "status": "error",
        "error": message
    }))
    .expect("valid fixture")
}

fn orchestrator(store: Arc<MemoryStore>, backend: Arc<StubBackend>) -> Orchestrator {
    Orchestrator::new(
        store,
        Arc::new(PassthroughResolver),
        backend,
        Arc::new(ProgressBroadcaster::new()),
    )
    .with_poll_interval(Duration::from_millis(20))
}

/// Drain a subscription until the channel closes, returning the events.
async fn drain(
    mut rx: tokio::sync::broadcast::Receiver<redline_events::ProgressEvent>,
) -> Vec<redline_events::ProgressEvent> {
    let mut events = Vec::new();
    loop {
        match rx.recv().await {
            Ok(event) => events.push(event),
            Err(RecvError::Closed) => return events,
            Err(RecvError::Lagged(_)) => continue,
        }
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_run_persists_result_and_streams_progress_in_order() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(StubBackend::new(
        Duration::from_millis(200),
        vec![Ok(success_response())],
        vec![20, 60, 100],
    ));
    let orchestrator = orchestrator(store.clone(), backend.clone());
    let task_id = store
        .insert_pending("https://blob/original.png", "https://blob/amendment.png")
        .await;

    let rx = orchestrator.subscribe(task_id).await;
    let status = orchestrator.run(task_id).await.expect("run succeeds");
    assert_eq!(status, TaskStatus::Completed);

    let task = store.get(task_id).await;
    assert_eq!(task.status, "completed");
    assert_eq!(task.trace_id.as_deref(), Some("t-1"));
    assert_eq!(task.processing_time_ms, Some(1200));
    assert!(task.error_message.is_none());
    let result = task.result.expect("result persisted");
    assert_eq!(result["sections_changed"][0], "3.1");

    let events = drain(rx).await;
    assert!(events.len() >= 2, "at least starting + terminal");
    assert_eq!(events[0].progress, 0);
    assert_eq!(events[0].message, "starting");

    let last = events.last().expect("terminal event");
    assert!(last.is_terminal());
    assert_eq!(last.status, "completed");
    assert_eq!(last.progress, 100);

    // Per-subscriber delivery is in publish order; the stub's values
    // only grow, so the stream is non-decreasing throughout.
    let progresses: Vec<u8> = events.iter().map(|e| e.progress).collect();
    assert!(progresses.windows(2).all(|w| w[0] <= w[1]), "{progresses:?}");
    assert!(progresses.contains(&20));
    assert!(progresses.contains(&60));
}

#[tokio::test]
async fn poller_is_stopped_once_run_returns() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(StubBackend::new(
        Duration::from_millis(100),
        vec![Ok(success_response())],
        vec![50],
    ));
    let orchestrator = orchestrator(store.clone(), backend.clone());
    let task_id = store
        .insert_pending("https://blob/a.png", "https://blob/b.png")
        .await;

    orchestrator.run(task_id).await.expect("run succeeds");

    let polls_after_run = backend.progress_calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        backend.progress_calls.load(Ordering::SeqCst),
        polls_after_run,
        "no polling may continue after run returns",
    );
}

#[tokio::test]
async fn remote_reported_failure_is_terminal_and_not_retried() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(StubBackend::new(
        Duration::from_millis(30),
        vec![Ok(error_response("LLM timeout"))],
        vec![],
    ));
    let orchestrator = orchestrator(store.clone(), backend.clone());
    let task_id = store
        .insert_pending("https://blob/a.png", "https://blob/b.png")
        .await;

    let rx = orchestrator.subscribe(task_id).await;
    let status = orchestrator
        .run_with_retry(task_id, &RetryPolicy::default())
        .await
        .expect("business failure is a terminal outcome, not a fault");
    assert_eq!(status, TaskStatus::Failed);

    let task = store.get(task_id).await;
    assert_eq!(task.status, "failed");
    assert_eq!(task.error_message.as_deref(), Some("LLM timeout"));
    assert!(task.result.is_none());

    // Exactly one compare call: no retry for a remote-reported failure.
    assert_eq!(backend.compare_calls.load(Ordering::SeqCst), 1);

    let events = drain(rx).await;
    let last = events.last().expect("terminal event");
    assert_eq!(last.status, "failed");
    assert_eq!(last.progress, 100);
    assert!(last.message.contains("LLM timeout"));
}

#[tokio::test]
async fn backend_faults_are_retried_up_to_three_attempts() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(StubBackend::new(
        Duration::from_millis(10),
        vec![
            Err(BackendFault("connection refused".to_string())),
            Err(BackendFault("connection refused".to_string())),
            Ok(success_response()),
        ],
        vec![],
    ));
    let orchestrator = orchestrator(store.clone(), backend.clone());
    let task_id = store
        .insert_pending("https://blob/a.png", "https://blob/b.png")
        .await;

    let policy = RetryPolicy {
        max_attempts: 3,
        delay: Duration::from_millis(20),
    };
    let started = std::time::Instant::now();
    let status = orchestrator
        .run_with_retry(task_id, &policy)
        .await
        .expect("third attempt succeeds");
    assert_eq!(status, TaskStatus::Completed);
    assert_eq!(backend.compare_calls.load(Ordering::SeqCst), 3);
    // Exactly two retry delays elapsed.
    assert!(started.elapsed() >= policy.delay * 2);

    let task = store.get(task_id).await;
    assert_eq!(task.status, "completed");
    assert!(task.result.is_some());
}

#[tokio::test]
async fn retry_gives_up_after_max_attempts() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(StubBackend::new(
        Duration::from_millis(5),
        vec![Err(BackendFault("connection refused".to_string()))],
        vec![],
    ));
    let orchestrator = orchestrator(store.clone(), backend.clone());
    let task_id = store
        .insert_pending("https://blob/a.png", "https://blob/b.png")
        .await;

    let policy = RetryPolicy {
        max_attempts: 3,
        delay: Duration::from_millis(5),
    };
    let err = orchestrator
        .run_with_retry(task_id, &policy)
        .await
        .expect_err("all attempts fault");
    assert_matches!(err, OrchestratorError::Backend(_));
    assert_eq!(backend.compare_calls.load(Ordering::SeqCst), 3);

    // The task remains failed with the last error message attached.
    let task = store.get(task_id).await;
    assert_eq!(task.status, "failed");
    assert_eq!(task.error_message.as_deref(), Some("connection refused"));
}

#[tokio::test]
async fn polling_failures_never_fail_the_run() {
    let store = Arc::new(MemoryStore::new());
    // Empty progress sequence: every poll returns "no data".
    let backend = Arc::new(StubBackend::new(
        Duration::from_millis(150),
        vec![Ok(success_response())],
        vec![],
    ));
    let orchestrator = orchestrator(store.clone(), backend.clone());
    let task_id = store
        .insert_pending("https://blob/a.png", "https://blob/b.png")
        .await;

    let status = orchestrator.run(task_id).await.expect("run succeeds");
    assert_eq!(status, TaskStatus::Completed);
    // The poller kept trying throughout the compare call.
    assert!(backend.progress_calls.load(Ordering::SeqCst) >= 3);
}

#[tokio::test]
async fn concurrent_runs_for_one_task_resolve_to_a_single_winner() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(StubBackend::new(
        Duration::from_millis(150),
        vec![Ok(success_response())],
        vec![],
    ));
    let orchestrator = Arc::new(orchestrator(store.clone(), backend.clone()));
    let task_id = store
        .insert_pending("https://blob/a.png", "https://blob/b.png")
        .await;

    let (first, second) = tokio::join!(orchestrator.run(task_id), orchestrator.run(task_id));

    let outcomes = [first, second];
    let wins = outcomes
        .iter()
        .filter(|r| matches!(r, Ok(TaskStatus::Completed)))
        .count();
    let declines = outcomes
        .iter()
        .filter(|r| matches!(r, Err(OrchestratorError::AlreadyRunning(_))))
        .count();
    assert_eq!((wins, declines), (1, 1), "{outcomes:?}");
    assert_eq!(backend.compare_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn task_already_processing_in_storage_is_declined() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(StubBackend::new(
        Duration::from_millis(5),
        vec![Ok(success_response())],
        vec![],
    ));
    let orchestrator = orchestrator(store.clone(), backend.clone());
    let task_id = store
        .insert_pending("https://blob/a.png", "https://blob/b.png")
        .await;
    // Another process already won the durable transition.
    store.set_status(task_id, "processing").await;

    let err = orchestrator.run(task_id).await.expect_err("must decline");
    assert_matches!(err, OrchestratorError::AlreadyRunning(_));
    assert_eq!(backend.compare_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_task_fails_with_not_found() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(StubBackend::new(
        Duration::from_millis(5),
        vec![Ok(success_response())],
        vec![],
    ));
    let orchestrator = orchestrator(store.clone(), backend.clone());

    let err = orchestrator
        .run(TaskId::new_v4())
        .await
        .expect_err("no record exists");
    assert_matches!(err, OrchestratorError::NotFound(_));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn unresolvable_document_fails_the_task_without_retry() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(StubBackend::new(
        Duration::from_millis(5),
        vec![Ok(success_response())],
        vec![],
    ));
    let orchestrator = orchestrator(store.clone(), backend.clone());
    // Bare refs are unavailable through the passthrough resolver.
    let task_id = store.insert_pending("bucket/a.png", "bucket/b.png").await;

    let err = orchestrator
        .run_with_retry(task_id, &RetryPolicy::default())
        .await
        .expect_err("blob is absent");
    assert_matches!(err, OrchestratorError::Blob(_));

    let task = store.get(task_id).await;
    assert_eq!(task.status, "failed");
    assert!(task
        .error_message
        .as_deref()
        .expect("diagnostic message")
        .contains("unavailable"));
    // The compare call was never issued.
    assert_eq!(backend.compare_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn terminal_state_is_persisted_before_terminal_event() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(StubBackend::new(
        Duration::from_millis(50),
        vec![Ok(success_response())],
        vec![],
    ));
    let orchestrator = Arc::new(orchestrator(store.clone(), backend.clone()));
    let task_id = store
        .insert_pending("https://blob/a.png", "https://blob/b.png")
        .await;

    let mut rx = orchestrator.subscribe(task_id).await;
    let observer_store = store.clone();
    let observer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) if event.is_terminal() => {
                    // Re-fetching on the terminal event must observe
                    // terminal data, never a stale `processing` read.
                    return observer_store.get(task_id).await.status;
                }
                Ok(_) => continue,
                Err(_) => panic!("stream closed before the terminal event"),
            }
        }
    });

    orchestrator.run(task_id).await.expect("run succeeds");
    let observed = observer.await.expect("observer task");
    assert_eq!(observed, "completed");
}
