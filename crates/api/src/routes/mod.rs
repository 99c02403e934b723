pub mod health;
pub mod page;
pub mod project;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /projects                                 list, create
/// /projects/{id}                            get, delete
/// /projects/{id}/status                     generation progress snapshot
/// /projects/{id}/generate                   start a generation epoch (POST)
/// /projects/{id}/regenerate                 discard current epoch, start fresh (POST)
/// /projects/{id}/abort                      cancel the active epoch (POST)
/// /projects/{id}/export/{format}            download pptx/pdf (GET)
/// /projects/{id}/template                   upload (POST), remove (DELETE)
/// /projects/{id}/materials                  upload material image (POST)
/// /projects/{id}/pages                      list pages (GET)
/// /projects/{id}/pages/order                manual reorder (PUT)
///
/// /pages/{id}                               get
/// /pages/{id}                               delete (renumbers survivors)
/// /pages/{id}/description                   manual description edit (PUT)
/// /pages/{id}/edit                          instruction-driven image edit (POST)
/// /pages/{id}/regenerate-description        fresh description task (POST)
/// /pages/{id}/regenerate-image              fresh image task (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Project CRUD, generation control, uploads, export.
        .nest("/projects", project::router())
        // Page-scoped operations.
        .nest("/pages", page::router())
}
