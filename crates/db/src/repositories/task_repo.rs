//! Repository for the `comparison_tasks` table.

use redline_core::types::TaskId;
use sqlx::PgPool;

use crate::models::task::ComparisonTask;

/// Column list for `comparison_tasks` queries.
const COLUMNS: &str = "\
    id, status, original_ref, amendment_ref, result, trace_id, \
    processing_time_ms, error_message, created_at, updated_at, completed_at";

/// Provides query operations for comparison task records.
pub struct TaskRepo;

impl TaskRepo {
    // ── Queries ──────────────────────────────────────────────────────

    /// Create a new pending task, returning the inserted row.
    pub async fn create(
        pool: &PgPool,
        original_ref: &str,
        amendment_ref: &str,
    ) -> Result<ComparisonTask, sqlx::Error> {
        let query = format!(
            "INSERT INTO comparison_tasks (original_ref, amendment_ref) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ComparisonTask>(&query)
            .bind(original_ref)
            .bind(amendment_ref)
            .fetch_one(pool)
            .await
    }

    /// Find a task by id.
    pub async fn find_by_id(
        pool: &PgPool,
        id: TaskId,
    ) -> Result<Option<ComparisonTask>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM comparison_tasks WHERE id = $1");
        sqlx::query_as::<_, ComparisonTask>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List pending tasks, oldest first.
    pub async fn list_pending(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<ComparisonTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comparison_tasks \
             WHERE status = 'pending' \
             ORDER BY created_at \
             LIMIT $1"
        );
        sqlx::query_as::<_, ComparisonTask>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    // ── Status transitions ───────────────────────────────────────────

    /// Atomically win the transition into `processing`.
    ///
    /// Only a `pending` task, or a `failed` task being re-attempted, is
    /// eligible. Returns `false` when another invocation already holds
    /// the task or it has already completed — the caller must then
    /// decline the run. The stale error message of a re-attempted task
    /// is cleared here so `error_message` stays tied to `failed`.
    pub async fn begin_processing(pool: &PgPool, id: TaskId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE comparison_tasks \
             SET status = 'processing', error_message = NULL, updated_at = NOW() \
             WHERE id = $1 AND status IN ('pending', 'failed')",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Persist the successful terminal state (status = 'completed').
    pub async fn mark_completed(
        pool: &PgPool,
        id: TaskId,
        result: &serde_json::Value,
        trace_id: Option<&str>,
        processing_time_ms: Option<i64>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE comparison_tasks \
             SET status = 'completed', result = $2, trace_id = $3, \
                 processing_time_ms = $4, error_message = NULL, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(result)
        .bind(trace_id)
        .bind(processing_time_ms)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Persist the failed terminal state with its diagnostic message.
    pub async fn mark_failed(
        pool: &PgPool,
        id: TaskId,
        error_message: &str,
        trace_id: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE comparison_tasks \
             SET status = 'failed', error_message = $2, trace_id = $3, \
                 result = NULL, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .bind(trace_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
