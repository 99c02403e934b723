//! Handlers driving deck generation: start, regenerate, abort, status.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use slidecraft_core::error::CoreError;
use slidecraft_core::types::EntityId;
use slidecraft_db::models::page::Page;
use slidecraft_db::models::project::Project;
use slidecraft_db::models::status::{PageStatus, ProjectStatus};
use slidecraft_db::models::task::Task;
use slidecraft_db::repositories::{PageRepo, ProjectRepo, TaskRepo};
use slidecraft_pipeline::StartGeneration;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Snapshot of a project's generation progress.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub project: Project,
    /// Project status as a wire label, e.g. `"generating"`.
    pub status: &'static str,
    pub pages: Vec<PageProgress>,
    /// Task rows of the current epoch, oldest first.
    pub tasks: Vec<Task>,
}

/// A page row annotated with its wire status label.
#[derive(Debug, Serialize)]
pub struct PageProgress {
    #[serde(flatten)]
    pub page: Page,
    pub status: &'static str,
}

/// POST /api/v1/projects/{id}/generate
///
/// Opens a new generation epoch and returns 202 immediately; the deck
/// is produced in the background. The body is optional: a project with
/// a stored idea can be started with an empty request.
pub async fn start(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    body: Option<Json<StartGeneration>>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let project = state
        .orchestrator
        .clone()
        .start_generation(id, input)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(project)))
}

/// POST /api/v1/projects/{id}/regenerate
///
/// Discards the current epoch (cancelling its tasks) and starts a fresh
/// generation from the stored idea.
pub async fn regenerate(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let project = state.orchestrator.clone().regenerate(id).await?;
    Ok((StatusCode::ACCEPTED, Json(project)))
}

/// POST /api/v1/projects/{id}/abort
///
/// Cancels the active epoch's driver. Pending and running task rows of
/// the epoch are marked cancelled; the project is marked failed.
pub async fn abort(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<StatusCode> {
    let project = ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))?;
    if project.status_id != ProjectStatus::Generating.id() {
        return Err(AppError::Core(CoreError::Conflict(
            "Project has no active generation to abort".to_string(),
        )));
    }

    state.orchestrator.abort(id).await;
    TaskRepo::cancel_epoch(&state.pool, id, project.epoch).await?;
    ProjectRepo::finish_generation(&state.pool, id, project.epoch, ProjectStatus::Failed.id())
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// GET /api/v1/projects/{id}/status
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DataResponse<StatusReport>>> {
    let project = ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))?;

    let pages = PageRepo::list_by_project(&state.pool, id)
        .await?
        .into_iter()
        .map(|page| {
            let status = PageStatus::from_id(page.status_id)
                .map(PageStatus::as_str)
                .unwrap_or("unknown");
            PageProgress { page, status }
        })
        .collect();
    let tasks = TaskRepo::list_by_epoch(&state.pool, id, project.epoch).await?;

    let status = ProjectStatus::from_id(project.status_id)
        .map(ProjectStatus::as_str)
        .unwrap_or("unknown");
    Ok(Json(DataResponse {
        data: StatusReport {
            project,
            status,
            pages,
            tasks,
        },
    }))
}
