//! Repository for the `tasks` table.
//!
//! Tasks are append-only once terminal: `mark_failed`/`mark_succeeded`
//! close a row forever, and retries insert a fresh row via `create`.

use slidecraft_core::types::{EntityId, Epoch};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::status::{StatusId, TaskStatus};
use crate::models::task::{NewTask, Task};

/// Column list for `tasks` queries.
const COLUMNS: &str = "\
    id, project_id, page_id, kind_id, status_id, attempt, epoch, \
    error_kind_id, error_message, created_at, started_at, finished_at";

/// Provides CRUD operations for generation tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a new pending task.
    pub async fn create(pool: &PgPool, input: &NewTask) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (id, project_id, page_id, kind_id, status_id, attempt, epoch) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(Uuid::new_v4())
            .bind(input.project_id)
            .bind(input.page_id)
            .bind(input.kind_id)
            .bind(TaskStatus::Pending.id())
            .bind(input.attempt)
            .bind(input.epoch)
            .fetch_one(pool)
            .await
    }

    /// Transition `pending -> running`, setting `started_at`.
    ///
    /// Guarded on the current status: starting a task that is not
    /// pending affects zero rows, which the caller reports as a
    /// programming error rather than retrying.
    pub async fn mark_running(pool: &PgPool, id: EntityId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET status_id = $2, started_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(TaskStatus::Running.id())
        .bind(TaskStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Transition `running -> succeeded`, setting `finished_at`.
    pub async fn mark_succeeded(pool: &PgPool, id: EntityId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET status_id = $2, finished_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(TaskStatus::Succeeded.id())
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Transition `running -> failed` with the classified error preserved.
    pub async fn mark_failed(
        pool: &PgPool,
        id: EntityId,
        error_kind: StatusId,
        error_message: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET status_id = $2, error_kind_id = $3, error_message = $4, \
             finished_at = NOW() \
             WHERE id = $1 AND status_id = $5",
        )
        .bind(id)
        .bind(TaskStatus::Failed.id())
        .bind(error_kind)
        .bind(error_message)
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Cancel every non-terminal task of a project's epoch.
    ///
    /// Returns the number of tasks cancelled. In-flight provider calls
    /// for those tasks are allowed to finish; their results are dropped
    /// on the epoch check before any state mutation.
    pub async fn cancel_epoch(
        pool: &PgPool,
        project_id: EntityId,
        epoch: Epoch,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET status_id = $3, finished_at = NOW() \
             WHERE project_id = $1 AND epoch = $2 AND status_id IN ($4, $5)",
        )
        .bind(project_id)
        .bind(epoch)
        .bind(TaskStatus::Cancelled.id())
        .bind(TaskStatus::Pending.id())
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Find a task by its ID.
    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a project's tasks for one epoch, newest first.
    pub async fn list_by_epoch(
        pool: &PgPool,
        project_id: EntityId,
        epoch: Epoch,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks \
             WHERE project_id = $1 AND epoch = $2 \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .bind(epoch)
            .fetch_all(pool)
            .await
    }

    /// Count a project's non-terminal tasks under one epoch.
    pub async fn count_active(
        pool: &PgPool,
        project_id: EntityId,
        epoch: Epoch,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM tasks \
             WHERE project_id = $1 AND epoch = $2 AND status_id IN ($3, $4)",
        )
        .bind(project_id)
        .bind(epoch)
        .bind(TaskStatus::Pending.id())
        .bind(TaskStatus::Running.id())
        .fetch_one(pool)
        .await
    }
}
