//! Route definitions for the `/pages` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::page;
use crate::state::AppState;

/// Routes mounted at `/pages`.
///
/// ```text
/// GET    /{id}                          -> get_by_id
/// DELETE /{id}                          -> delete
/// PUT    /{id}/description              -> update_description
/// POST   /{id}/edit                     -> edit
/// POST   /{id}/regenerate-description   -> regenerate_description
/// POST   /{id}/regenerate-image         -> regenerate_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(page::get_by_id).delete(page::delete))
        .route("/{id}/description", put(page::update_description))
        .route("/{id}/edit", post(page::edit))
        .route(
            "/{id}/regenerate-description",
            post(page::regenerate_description),
        )
        .route("/{id}/regenerate-image", post(page::regenerate_image))
}
