//! Handlers for page-level operations: read, edit, reorder, delete,
//! per-stage regeneration.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use slidecraft_core::error::CoreError;
use slidecraft_core::ordering::{renumber, validate_reorder};
use slidecraft_core::types::EntityId;
use slidecraft_db::models::page::{Page, ReorderPages};
use slidecraft_db::models::status::ProjectStatus;
use slidecraft_db::repositories::{PageRepo, ProjectRepo};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Body for PUT /pages/{id}/description.
#[derive(Debug, Deserialize)]
pub struct UpdateDescription {
    pub description: String,
}

/// Body for POST /pages/{id}/edit.
#[derive(Debug, Deserialize)]
pub struct EditPage {
    pub instruction: String,
}

/// GET /api/v1/projects/{id}/pages
pub async fn list_by_project(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<Vec<Page>>> {
    require_project(&state, id).await?;
    let pages = PageRepo::list_by_project(&state.pool, id).await?;
    Ok(Json(pages))
}

/// GET /api/v1/pages/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<Page>> {
    let page = require_page(&state, id).await?;
    Ok(Json(page))
}

/// PUT /api/v1/pages/{id}/description
///
/// Manual edit of the description text. Does not touch the image; the
/// caller regenerates it separately if the text change should show.
pub async fn update_description(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(input): Json<UpdateDescription>,
) -> AppResult<Json<Page>> {
    if input.description.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Description must not be empty".to_string(),
        )));
    }
    let page = require_page(&state, id).await?;
    require_quiescent(&state, page.project_id).await?;

    PageRepo::update_description_text(&state.pool, id, &input.description).await?;
    let page = require_page(&state, id).await?;
    Ok(Json(page))
}

/// POST /api/v1/pages/{id}/edit
///
/// Applies an instruction-driven edit to a completed page's image.
/// Synchronous: responds once the new image is committed.
pub async fn edit(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(input): Json<EditPage>,
) -> AppResult<Json<Page>> {
    let page = state.orchestrator.edit_page(id, &input.instruction).await?;
    Ok(Json(page))
}

/// POST /api/v1/pages/{id}/regenerate-description
pub async fn regenerate_description(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<Page>> {
    let page = state.orchestrator.regenerate_page_description(id).await?;
    Ok(Json(page))
}

/// POST /api/v1/pages/{id}/regenerate-image
pub async fn regenerate_image(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<Page>> {
    let page = state.orchestrator.regenerate_page_image(id).await?;
    Ok(Json(page))
}

/// PUT /api/v1/projects/{id}/pages/order
///
/// Applies a manual reorder. The body must list every page id of the
/// project exactly once, in the desired deck order.
pub async fn reorder(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(input): Json<ReorderPages>,
) -> AppResult<Json<Vec<Page>>> {
    require_quiescent(&state, id).await?;
    let pages = PageRepo::list_by_project(&state.pool, id).await?;
    let existing: Vec<EntityId> = pages.iter().map(|p| p.id).collect();

    validate_reorder(&existing, &input.page_ids)?;
    let numbering = renumber(&input.page_ids);
    PageRepo::apply_order(&state.pool, id, &numbering).await?;

    let pages = PageRepo::list_by_project(&state.pool, id).await?;
    Ok(Json(pages))
}

/// DELETE /api/v1/pages/{id}
///
/// Removes the page, renumbers the survivors contiguously, and deletes
/// its image artifact.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<StatusCode> {
    let page = require_page(&state, id).await?;
    require_quiescent(&state, page.project_id).await?;

    let image_ref = PageRepo::delete_and_renumber(&state.pool, &page).await?;
    if let Some(reference) = image_ref {
        state.artifacts.delete(&reference).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

// -- helpers --

async fn require_page(state: &AppState, id: EntityId) -> Result<Page, AppError> {
    PageRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Page", id }))
}

async fn require_project(state: &AppState, id: EntityId) -> Result<(), AppError> {
    ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))?;
    Ok(())
}

/// Reject structural page mutations while a generation is running; the
/// epoch driver would race them.
async fn require_quiescent(state: &AppState, project_id: EntityId) -> Result<(), AppError> {
    let project = ProjectRepo::find_by_id(&state.pool, project_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;
    if project.status_id == ProjectStatus::Generating.id() {
        return Err(AppError::Core(CoreError::Conflict(
            "Project is generating; wait for it to finish before editing pages".to_string(),
        )));
    }
    Ok(())
}
