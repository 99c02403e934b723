//! Repository for the `projects` table.

use slidecraft_core::types::{EntityId, Epoch};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::project::{CreateProject, Project};
use crate::models::status::{ProjectStatus, StatusId};

/// Column list for `projects` queries.
const COLUMNS: &str = "\
    id, name, status_id, idea, extra_requirements, template_image_ref, \
    epoch, allow_partial, created_at, updated_at";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Create a new project in `draft` status with epoch 0.
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (id, name, status_id, idea, extra_requirements) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(Uuid::new_v4())
            .bind(&input.name)
            .bind(ProjectStatus::Draft.id())
            .bind(&input.idea)
            .bind(&input.extra_requirements)
            .fetch_one(pool)
            .await
    }

    /// Find a project by its ID.
    pub async fn find_by_id(pool: &PgPool, id: EntityId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all projects, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects ORDER BY created_at DESC");
        sqlx::query_as::<_, Project>(&query).fetch_all(pool).await
    }

    /// Atomically open a new generation epoch.
    ///
    /// Bumps the epoch, stores the idea/extra requirements, and moves the
    /// project to `generating`, but only if it is not already
    /// generating. Returns `None` when another epoch is active, which the
    /// orchestrator surfaces as a conflict. This single conditional
    /// UPDATE is what enforces one-active-epoch-per-project.
    pub async fn begin_generation(
        pool: &PgPool,
        id: EntityId,
        idea: Option<&str>,
        extra_requirements: Option<&str>,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects \
             SET epoch = epoch + 1, status_id = $2, idea = COALESCE($3, idea), \
                 extra_requirements = COALESCE($4, extra_requirements), updated_at = NOW() \
             WHERE id = $1 AND status_id <> $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(ProjectStatus::Generating.id())
            .bind(idea)
            .bind(extra_requirements)
            .fetch_optional(pool)
            .await
    }

    /// Force-open a new epoch regardless of the current status.
    ///
    /// Used by `regenerate`, which first cancels the old epoch's tasks.
    pub async fn bump_epoch(pool: &PgPool, id: EntityId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects \
             SET epoch = epoch + 1, status_id = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(ProjectStatus::Generating.id())
            .fetch_optional(pool)
            .await
    }

    /// Move the project to a terminal status, guarded by epoch so a stale
    /// worker can never conclude a newer generation.
    ///
    /// Returns `true` if the row was updated.
    pub async fn finish_generation(
        pool: &PgPool,
        id: EntityId,
        epoch: Epoch,
        status: StatusId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET status_id = $3, updated_at = NOW() \
             WHERE id = $1 AND epoch = $2",
        )
        .bind(id)
        .bind(epoch)
        .bind(status)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set or clear the template image reference.
    pub async fn set_template_image(
        pool: &PgPool,
        id: EntityId,
        image_ref: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET template_image_ref = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(image_ref)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a project. Pages and tasks cascade via foreign keys.
    pub async fn delete(pool: &PgPool, id: EntityId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
