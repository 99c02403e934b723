//! Handler for deck export downloads.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue};
use slidecraft_core::error::CoreError;
use slidecraft_core::types::EntityId;
use slidecraft_db::models::status::PageStatus;
use slidecraft_db::repositories::{PageRepo, ProjectRepo};
use slidecraft_export::{export_deck, ExportFormat};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/v1/projects/{id}/export/{format}
///
/// Assembles the deck from completed page images in `order_index`
/// order. Pages without a completed image are skipped; an entirely
/// imageless deck is a 409 (`NO_CONTENT`).
pub async fn download(
    State(state): State<AppState>,
    Path((id, format)): Path<(EntityId, String)>,
) -> AppResult<(HeaderMap, Vec<u8>)> {
    let format = ExportFormat::from_str(&format)?;
    let project = ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))?;

    let pages = PageRepo::list_by_project(&state.pool, id).await?;
    let mut images = Vec::new();
    for page in &pages {
        if page.status_id != PageStatus::Completed.id() {
            continue;
        }
        let Some(reference) = &page.image_ref else {
            continue;
        };
        images.push(state.artifacts.get(reference).await?);
    }

    let bytes = export_deck(&images, format)?;
    tracing::info!(project_id = %id, slides = images.len(), format = format.extension(), "Exported deck");

    let filename = export_filename(&project.name, format);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(format.content_type()),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")).map_err(|e| {
            AppError::InternalError(format!("invalid content-disposition header: {e}"))
        })?,
    );
    Ok((headers, bytes))
}

/// Build a download filename from the project name, restricted to a
/// header-safe character set.
fn export_filename(name: &str, format: ExportFormat) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() { "deck".to_string() } else { stem };
    format!("{stem}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_header_safe() {
        assert_eq!(
            export_filename("My Deck: v2", ExportFormat::Pptx),
            "My_Deck__v2.pptx"
        );
        assert_eq!(export_filename("", ExportFormat::Pdf), "deck.pdf");
        assert_eq!(export_filename("plain", ExportFormat::Pdf), "plain.pdf");
    }
}
