//! Handlers for template and material image uploads (multipart).

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use slidecraft_core::error::CoreError;
use slidecraft_core::types::EntityId;
use slidecraft_db::models::project::Project;
use slidecraft_db::repositories::ProjectRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Response for a stored material image.
#[derive(Debug, Serialize)]
pub struct MaterialUploaded {
    /// Opaque artifact reference of the stored image.
    pub reference: String,
}

/// POST /api/v1/projects/{id}/template
///
/// Stores the uploaded image as the project's style template, replacing
/// (and deleting) any previous one. Expects a single multipart file
/// field.
pub async fn put_template(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    multipart: Multipart,
) -> AppResult<Json<Project>> {
    let project = require_project(&state, id).await?;
    let bytes = read_file_field(multipart).await?;

    let reference = state.artifacts.put_template_image(id, &bytes).await?;
    ProjectRepo::set_template_image(&state.pool, id, Some(&reference)).await?;

    if let Some(old) = project
        .template_image_ref
        .filter(|old| old != &reference)
    {
        if let Err(e) = state.artifacts.delete(&old).await {
            tracing::warn!(reference = old, error = %e, "Failed to delete replaced template image");
        }
    }

    let project = require_project(&state, id).await?;
    Ok(Json(project))
}

/// DELETE /api/v1/projects/{id}/template
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<StatusCode> {
    let project = require_project(&state, id).await?;
    ProjectRepo::set_template_image(&state.pool, id, None).await?;
    if let Some(reference) = project.template_image_ref {
        state.artifacts.delete(&reference).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/projects/{id}/materials
///
/// Stores a material image. All of a project's materials are passed to
/// image generation alongside the template.
pub async fn put_material(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<MaterialUploaded>>)> {
    require_project(&state, id).await?;
    let bytes = read_file_field(multipart).await?;

    let reference = state.artifacts.put_material_image(id, &bytes).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: MaterialUploaded { reference },
        }),
    ))
}

// -- helpers --

async fn require_project(state: &AppState, id: EntityId) -> Result<Project, AppError> {
    ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))
}

/// Pull the first non-empty file field out of a multipart body.
async fn read_file_field(mut multipart: Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
        if !bytes.is_empty() {
            return Ok(bytes.to_vec());
        }
    }
    Err(AppError::BadRequest(
        "Expected a multipart file field".to_string(),
    ))
}
