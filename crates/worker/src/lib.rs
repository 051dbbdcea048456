//! Background worker for document comparison tasks.
//!
//! Scans the store for pending tasks on a fixed cadence and drives each
//! one through the orchestrator under a bounded concurrency budget. A
//! scan may re-surface a task that is already in flight; the
//! orchestrator declines the duplicate, so the loop does not track
//! in-flight ids itself.

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use redline_core::retry::RetryPolicy;
use redline_db::repositories::TaskRepo;
use redline_db::DbPool;
use redline_orchestrator::{Orchestrator, OrchestratorError};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// How often the claim loop scans for pending tasks.
const CLAIM_INTERVAL: Duration = Duration::from_secs(2);

/// Upper bound on tasks picked up per scan.
const CLAIM_BATCH: i64 = 16;

/// Run the claim loop until `shutdown` is cancelled.
///
/// Returns once cancellation is observed and every spawned task run has
/// finished; in-flight comparisons are allowed to complete.
pub async fn run_claim_loop(
    pool: DbPool,
    orchestrator: Arc<Orchestrator>,
    concurrency: u32,
    shutdown: CancellationToken,
) {
    let semaphore = Arc::new(Semaphore::new(concurrency as usize));
    let policy = RetryPolicy::default();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(CLAIM_INTERVAL) => {}
        }

        let pending = match TaskRepo::list_pending(&pool, CLAIM_BATCH).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(error = %e, "Pending-task scan failed, will retry next cycle");
                continue;
            }
        };

        for task in pending {
            // Wait for a concurrency slot, unless shutdown wins first.
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };

            let orchestrator = Arc::clone(&orchestrator);
            let policy = policy.clone();
            tokio::spawn(async move {
                let _permit = permit;
                match orchestrator.run_with_retry(task.id, &policy).await {
                    Ok(status) => {
                        tracing::info!(task_id = %task.id, %status, "Task run finished");
                    }
                    Err(OrchestratorError::AlreadyRunning(_)) => {
                        tracing::debug!(task_id = %task.id, "Task already in flight, skipped");
                    }
                    Err(e) => {
                        tracing::error!(task_id = %task.id, error = %e, "Task run failed");
                    }
                }
            });
        }
    }

    tracing::info!("Claim loop stopped, draining in-flight tasks");
    let _ = semaphore.acquire_many(concurrency).await;
}
