//! Postgres-backed [`DeckStore`] delegating to the `slidecraft-db`
//! repositories.

use async_trait::async_trait;
use slidecraft_core::error::CoreError;
use slidecraft_core::outline::PageSpec;
use slidecraft_core::types::{EntityId, Epoch};
use slidecraft_db::models::page::Page;
use slidecraft_db::models::project::Project;
use slidecraft_db::models::status::{PageStatus, ProjectStatus, TaskErrorKind};
use slidecraft_db::models::task::{NewTask, Task};
use slidecraft_db::repositories::{PageRepo, ProjectRepo, TaskRepo};
use slidecraft_db::DbPool;

use crate::store::DeckStore;

/// Production [`DeckStore`] over the shared connection pool.
#[derive(Clone)]
pub struct PgDeckStore {
    pool: DbPool,
}

impl PgDeckStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("database error: {e}"))
}

#[async_trait]
impl DeckStore for PgDeckStore {
    async fn find_project(&self, id: EntityId) -> Result<Option<Project>, CoreError> {
        ProjectRepo::find_by_id(&self.pool, id).await.map_err(db_err)
    }

    async fn begin_generation(
        &self,
        id: EntityId,
        idea: Option<&str>,
        extra_requirements: Option<&str>,
    ) -> Result<Option<Project>, CoreError> {
        ProjectRepo::begin_generation(&self.pool, id, idea, extra_requirements)
            .await
            .map_err(db_err)
    }

    async fn bump_epoch(&self, id: EntityId) -> Result<Option<Project>, CoreError> {
        ProjectRepo::bump_epoch(&self.pool, id).await.map_err(db_err)
    }

    async fn finish_generation(
        &self,
        id: EntityId,
        epoch: Epoch,
        status: ProjectStatus,
    ) -> Result<bool, CoreError> {
        ProjectRepo::finish_generation(&self.pool, id, epoch, status.id())
            .await
            .map_err(db_err)
    }

    async fn replace_pages(
        &self,
        project_id: EntityId,
        specs: &[PageSpec],
    ) -> Result<Vec<Page>, CoreError> {
        PageRepo::delete_by_project(&self.pool, project_id)
            .await
            .map_err(db_err)?;
        PageRepo::create_from_specs(&self.pool, project_id, specs)
            .await
            .map_err(db_err)
    }

    async fn find_page(&self, id: EntityId) -> Result<Option<Page>, CoreError> {
        PageRepo::find_by_id(&self.pool, id).await.map_err(db_err)
    }

    async fn list_pages(&self, project_id: EntityId) -> Result<Vec<Page>, CoreError> {
        PageRepo::list_by_project(&self.pool, project_id)
            .await
            .map_err(db_err)
    }

    async fn set_page_status(&self, id: EntityId, status: PageStatus) -> Result<(), CoreError> {
        let updated = PageRepo::set_status(&self.pool, id, status.id())
            .await
            .map_err(db_err)?;
        if !updated {
            tracing::debug!(page_id = %id, "Status update hit a deleted page");
        }
        Ok(())
    }

    async fn set_page_description(
        &self,
        id: EntityId,
        description: &str,
        attempts: i32,
    ) -> Result<(), CoreError> {
        PageRepo::set_description(&self.pool, id, description, attempts)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn swap_page_image(
        &self,
        id: EntityId,
        image_ref: &str,
        attempts: i32,
    ) -> Result<Option<String>, CoreError> {
        PageRepo::swap_image_ref(&self.pool, id, image_ref, attempts)
            .await
            .map_err(db_err)
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, CoreError> {
        TaskRepo::create(&self.pool, task).await.map_err(db_err)
    }

    async fn mark_task_running(&self, id: EntityId) -> Result<bool, CoreError> {
        TaskRepo::mark_running(&self.pool, id).await.map_err(db_err)
    }

    async fn mark_task_succeeded(&self, id: EntityId) -> Result<(), CoreError> {
        TaskRepo::mark_succeeded(&self.pool, id)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn mark_task_failed(
        &self,
        id: EntityId,
        error_kind: TaskErrorKind,
        error_message: &str,
    ) -> Result<(), CoreError> {
        TaskRepo::mark_failed(&self.pool, id, error_kind.id(), error_message)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn cancel_epoch_tasks(
        &self,
        project_id: EntityId,
        epoch: Epoch,
    ) -> Result<u64, CoreError> {
        TaskRepo::cancel_epoch(&self.pool, project_id, epoch)
            .await
            .map_err(db_err)
    }

    async fn list_epoch_tasks(
        &self,
        project_id: EntityId,
        epoch: Epoch,
    ) -> Result<Vec<Task>, CoreError> {
        TaskRepo::list_by_epoch(&self.pool, project_id, epoch)
            .await
            .map_err(db_err)
    }
}
