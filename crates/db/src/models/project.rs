//! Project entity model and DTOs.

use serde::{Deserialize, Serialize};
use slidecraft_core::types::{EntityId, Epoch, Timestamp};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: EntityId,
    pub name: String,
    pub status_id: StatusId,
    /// The free-form idea the deck is generated from.
    pub idea: Option<String>,
    /// Extra requirements appended to generation prompts.
    pub extra_requirements: Option<String>,
    /// Artifact reference of the uploaded style template image.
    pub template_image_ref: Option<String>,
    /// Current generation epoch. 0 until the first generation starts.
    pub epoch: Epoch,
    /// When false, any permanently failed page fails the whole project.
    pub allow_partial: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new project.
#[derive(Debug, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub idea: Option<String>,
    pub extra_requirements: Option<String>,
}
