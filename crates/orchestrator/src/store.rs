//! Durable task storage seam and its Postgres implementation.

use async_trait::async_trait;
use redline_core::error::StoreError;
use redline_core::task::ComparisonOutcome;
use redline_core::types::TaskId;
use redline_db::models::ComparisonTask;
use redline_db::repositories::TaskRepo;

/// Durable task record operations consumed by the orchestrator.
///
/// Field-level updates are atomic; `begin_processing` doubles as the
/// durable arbiter for the one-invocation-per-task rule.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Load a task; [`StoreError::NotFound`] if absent.
    async fn load(&self, id: TaskId) -> Result<ComparisonTask, StoreError>;

    /// Atomically win the transition into `processing`. Returns `false`
    /// when the task is not in a state this invocation may take over.
    async fn begin_processing(&self, id: TaskId) -> Result<bool, StoreError>;

    /// Persist the successful terminal state.
    async fn complete(
        &self,
        id: TaskId,
        result: &ComparisonOutcome,
        trace_id: Option<&str>,
        processing_time_ms: Option<i64>,
    ) -> Result<(), StoreError>;

    /// Persist the failed terminal state with its diagnostic message.
    async fn fail(
        &self,
        id: TaskId,
        error_message: &str,
        trace_id: Option<&str>,
    ) -> Result<(), StoreError>;
}

/// [`TaskStore`] backed by the Postgres [`TaskRepo`].
pub struct PgTaskStore {
    pool: sqlx::PgPool,
}

impl PgTaskStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn load(&self, id: TaskId) -> Result<ComparisonTask, StoreError> {
        TaskRepo::find_by_id(&self.pool, id)
            .await
            .map_err(db_err)?
            .ok_or(StoreError::NotFound(id))
    }

    async fn begin_processing(&self, id: TaskId) -> Result<bool, StoreError> {
        TaskRepo::begin_processing(&self.pool, id)
            .await
            .map_err(db_err)
    }

    async fn complete(
        &self,
        id: TaskId,
        result: &ComparisonOutcome,
        trace_id: Option<&str>,
        processing_time_ms: Option<i64>,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_value(result)
            .map_err(|e| StoreError::Database(format!("serialize result: {e}")))?;
        TaskRepo::mark_completed(&self.pool, id, &payload, trace_id, processing_time_ms)
            .await
            .map_err(db_err)
    }

    async fn fail(
        &self,
        id: TaskId,
        error_message: &str,
        trace_id: Option<&str>,
    ) -> Result<(), StoreError> {
        TaskRepo::mark_failed(&self.pool, id, error_message, trace_id)
            .await
            .map_err(db_err)
    }
}
