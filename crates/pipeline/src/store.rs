//! The [`DeckStore`] persistence trait.
//!
//! Everything the orchestrator needs from the database, expressed as a
//! trait so integration tests can run the full pipeline against an
//! in-memory implementation. The production implementation is
//! [`PgDeckStore`](crate::postgres::PgDeckStore).

use async_trait::async_trait;
use slidecraft_core::error::CoreError;
use slidecraft_core::outline::PageSpec;
use slidecraft_core::types::{EntityId, Epoch};
use slidecraft_db::models::page::Page;
use slidecraft_db::models::project::Project;
use slidecraft_db::models::status::{PageStatus, ProjectStatus, TaskErrorKind};
use slidecraft_db::models::task::{NewTask, Task};

/// Persistence operations used by the generation orchestrator.
///
/// Implementations must uphold the epoch discipline documented on each
/// method: `begin_generation` is the single-flight gate, and
/// `finish_generation` must be a no-op when the epoch has moved on.
#[async_trait]
pub trait DeckStore: Send + Sync {
    // -- Projects --

    async fn find_project(&self, id: EntityId) -> Result<Option<Project>, CoreError>;

    /// Atomically open a new generation epoch, failing (returning `None`)
    /// when the project is already generating. `idea` and
    /// `extra_requirements` overwrite the stored values only when
    /// provided.
    async fn begin_generation(
        &self,
        id: EntityId,
        idea: Option<&str>,
        extra_requirements: Option<&str>,
    ) -> Result<Option<Project>, CoreError>;

    /// Open a new epoch unconditionally. Used by regenerate after the
    /// previous epoch's tasks have been cancelled.
    async fn bump_epoch(&self, id: EntityId) -> Result<Option<Project>, CoreError>;

    /// Move the project to a terminal status if (and only if) `epoch` is
    /// still the project's current epoch. Returns whether the row moved.
    async fn finish_generation(
        &self,
        id: EntityId,
        epoch: Epoch,
        status: ProjectStatus,
    ) -> Result<bool, CoreError>;

    // -- Pages --

    /// Replace the project's pages with one pending page per outline
    /// spec, `order_index` contiguous from 0. Returns the new pages in
    /// deck order.
    async fn replace_pages(
        &self,
        project_id: EntityId,
        specs: &[PageSpec],
    ) -> Result<Vec<Page>, CoreError>;

    async fn find_page(&self, id: EntityId) -> Result<Option<Page>, CoreError>;

    /// List a project's pages ordered by `order_index` ascending.
    async fn list_pages(&self, project_id: EntityId) -> Result<Vec<Page>, CoreError>;

    /// Update a page's status. A missing page (deleted concurrently) is
    /// not an error.
    async fn set_page_status(&self, id: EntityId, status: PageStatus) -> Result<(), CoreError>;

    /// Store a generated description along with the attempts consumed by
    /// the description stage.
    async fn set_page_description(
        &self,
        id: EntityId,
        description: &str,
        attempts: i32,
    ) -> Result<(), CoreError>;

    /// Atomically swap the page's image reference, mark it completed,
    /// and return the previous reference so the caller can delete the
    /// old artifact after the swap commits.
    async fn swap_page_image(
        &self,
        id: EntityId,
        image_ref: &str,
        attempts: i32,
    ) -> Result<Option<String>, CoreError>;

    // -- Tasks --

    async fn create_task(&self, task: &NewTask) -> Result<Task, CoreError>;

    /// Transition `pending -> running`. Returns `false` when the task
    /// was not pending, which callers report as a programming error.
    async fn mark_task_running(&self, id: EntityId) -> Result<bool, CoreError>;

    async fn mark_task_succeeded(&self, id: EntityId) -> Result<(), CoreError>;

    async fn mark_task_failed(
        &self,
        id: EntityId,
        error_kind: TaskErrorKind,
        error_message: &str,
    ) -> Result<(), CoreError>;

    /// Cancel every non-terminal task of a project's epoch. Returns the
    /// number of tasks cancelled.
    async fn cancel_epoch_tasks(&self, project_id: EntityId, epoch: Epoch)
        -> Result<u64, CoreError>;

    /// List a project's tasks for one epoch, newest first.
    async fn list_epoch_tasks(
        &self,
        project_id: EntityId,
        epoch: Epoch,
    ) -> Result<Vec<Task>, CoreError>;
}
