//! Task entity model.
//!
//! Tasks are immutable once terminal: a retry inserts a fresh row with
//! an incremented attempt number instead of mutating the failed one, so
//! the task log doubles as an audit trail of every generation attempt.

use serde::Serialize;
use slidecraft_core::types::{EntityId, Epoch, Timestamp};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: EntityId,
    pub project_id: EntityId,
    /// Null for project-level tasks (outline generation).
    pub page_id: Option<EntityId>,
    pub kind_id: StatusId,
    pub status_id: StatusId,
    /// 1-based attempt number for this (page, kind, epoch) unit of work.
    pub attempt: i32,
    /// Copy of the project's epoch at creation time. A task whose epoch
    /// differs from the project's current epoch is void; its result is
    /// discarded on completion.
    pub epoch: Epoch,
    pub error_kind_id: Option<StatusId>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

/// Parameters for inserting a new pending task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: EntityId,
    pub page_id: Option<EntityId>,
    pub kind_id: StatusId,
    pub attempt: i32,
    pub epoch: Epoch,
}
