//! Route definitions for the `/projects` resource.
//!
//! Generation control, uploads, page listing, and export live under
//! `/projects/{id}/...`; single-page operations live under `/pages`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{export, generation, page, project, upload};
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                          -> list
/// POST   /                          -> create
/// GET    /{id}                      -> get_by_id
/// DELETE /{id}                      -> delete
///
/// GET    /{id}/status               -> generation::status
/// POST   /{id}/generate             -> generation::start
/// POST   /{id}/regenerate           -> generation::regenerate
/// POST   /{id}/abort                -> generation::abort
///
/// GET    /{id}/export/{format}      -> export::download
///
/// POST   /{id}/template             -> upload::put_template
/// DELETE /{id}/template             -> upload::delete_template
/// POST   /{id}/materials            -> upload::put_material
///
/// GET    /{id}/pages                -> page::list_by_project
/// PUT    /{id}/pages/order          -> page::reorder
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list).post(project::create))
        .route("/{id}", get(project::get_by_id).delete(project::delete))
        .route("/{id}/status", get(generation::status))
        .route("/{id}/generate", post(generation::start))
        .route("/{id}/regenerate", post(generation::regenerate))
        .route("/{id}/abort", post(generation::abort))
        .route("/{id}/export/{format}", get(export::download))
        .route(
            "/{id}/template",
            post(upload::put_template).delete(upload::delete_template),
        )
        .route("/{id}/materials", post(upload::put_material))
        .route("/{id}/pages", get(page::list_by_project))
        .route("/{id}/pages/order", put(page::reorder))
}
