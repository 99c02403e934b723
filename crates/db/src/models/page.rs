//! Page entity model and DTOs.

use serde::{Deserialize, Serialize};
use slidecraft_core::types::{EntityId, Timestamp};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `pages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Page {
    pub id: EntityId,
    pub project_id: EntityId,
    /// Deck position. Contiguous and unique within a project; defines
    /// export order.
    pub order_index: i32,
    pub title: Option<String>,
    /// Section label carried from a part-based outline, if any.
    pub section: Option<String>,
    /// Outline bullet points for this page, as JSON array of strings.
    pub points: serde_json::Value,
    /// Generated page description. Null until the description task succeeds.
    pub description: Option<String>,
    /// Artifact reference of the generated image. Null until the image
    /// task succeeds.
    pub image_ref: Option<String>,
    pub status_id: StatusId,
    /// Attempts consumed by the description stage under the current epoch.
    pub describe_attempts: i32,
    /// Attempts consumed by the image stage under the current epoch.
    pub image_attempts: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Page {
    /// Bullet points as plain strings (empty on malformed JSON).
    pub fn points_vec(&self) -> Vec<String> {
        serde_json::from_value(self.points.clone()).unwrap_or_default()
    }
}

/// DTO for a manual page reorder request.
#[derive(Debug, Deserialize)]
pub struct ReorderPages {
    /// Every page id of the project, in the desired deck order.
    pub page_ids: Vec<EntityId>,
}
