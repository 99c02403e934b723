//! Outline parsing: turning the model's outline response into ordered
//! page specifications.
//!
//! The model may answer in two shapes:
//!
//! 1. Simple format, for short decks without major sections:
//!    `[{"title": "...", "points": ["...", "..."]}, ...]`
//! 2. Part-based format, for longer decks:
//!    `[{"part": "Part 1: Intro", "pages": [{"title": ..., "points": [...]}]}, ...]`
//!
//! Both are flattened into a single ordered `Vec<PageSpec>`; the part
//! label (if any) is carried along as the page's section so image
//! generation can keep section-context continuity.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Hard ceiling on pages per deck to prevent runaway outlines.
pub const MAX_PAGES_PER_PROJECT: usize = 100;

/// One planned page, in deck order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    /// Page title from the outline.
    pub title: String,
    /// Bullet points (may include markdown image links as materials).
    pub points: Vec<String>,
    /// Section label when the outline used the part-based format.
    pub section: Option<String>,
}

/// Raw simple-format page as emitted by the model.
#[derive(Debug, Deserialize)]
struct RawPage {
    title: String,
    #[serde(default)]
    points: Vec<String>,
}

/// Raw part-based entry as emitted by the model.
#[derive(Debug, Deserialize)]
struct RawPart {
    part: String,
    pages: Vec<RawPage>,
}

/// One entry of the outline array: either a bare page or a part.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Part(RawPart),
    Page(RawPage),
}

/// Parse a model outline response into ordered page specs.
///
/// Strips a surrounding markdown code fence if present, then accepts
/// either outline format (entries of both kinds may even be mixed).
/// Fails with [`CoreError::Validation`] on malformed JSON, an empty
/// outline, an empty page title, or an outline exceeding
/// [`MAX_PAGES_PER_PROJECT`].
pub fn parse_outline(raw: &str) -> Result<Vec<PageSpec>, CoreError> {
    let json = strip_code_fence(raw);

    let entries: Vec<RawEntry> = serde_json::from_str(json)
        .map_err(|e| CoreError::Validation(format!("Malformed outline JSON: {e}")))?;

    let mut pages = Vec::new();
    for entry in entries {
        match entry {
            RawEntry::Page(p) => pages.push(to_spec(p, None)?),
            RawEntry::Part(part) => {
                let section = part.part.trim().to_string();
                if section.is_empty() {
                    return Err(CoreError::Validation(
                        "Outline part label must not be empty".to_string(),
                    ));
                }
                for p in part.pages {
                    pages.push(to_spec(p, Some(section.clone()))?);
                }
            }
        }
    }

    if pages.is_empty() {
        return Err(CoreError::Validation(
            "Outline contains no pages".to_string(),
        ));
    }
    if pages.len() > MAX_PAGES_PER_PROJECT {
        return Err(CoreError::Validation(format!(
            "Outline has {} pages; at most {MAX_PAGES_PER_PROJECT} are allowed",
            pages.len()
        )));
    }

    Ok(pages)
}

/// Render page specs back into a plain-text outline for prompt context.
///
/// Section headers are emitted once, when the section changes.
pub fn render_outline(pages: &[PageSpec]) -> String {
    let mut out = String::new();
    let mut current_section: Option<&str> = None;

    for (i, page) in pages.iter().enumerate() {
        if let Some(section) = page.section.as_deref() {
            if current_section != Some(section) {
                out.push_str(section);
                out.push('\n');
                current_section = Some(section);
            }
        }
        out.push_str(&format!("{}. {}\n", i + 1, page.title));
        for point in &page.points {
            out.push_str(&format!("   - {point}\n"));
        }
    }

    out
}

/// Strip a surrounding markdown code fence (with or without a language
/// tag) from a model response. Returns the input unchanged when no
/// fence is present.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line, if any.
    match body.split_once('\n') {
        Some((first_line, remainder)) if !first_line.trim().contains(' ') => remainder.trim(),
        _ => body.trim(),
    }
}

fn to_spec(raw: RawPage, section: Option<String>) -> Result<PageSpec, CoreError> {
    let title = raw.title.trim().to_string();
    if title.is_empty() {
        return Err(CoreError::Validation(
            "Outline page title must not be empty".to_string(),
        ));
    }
    Ok(PageSpec {
        title,
        points: raw.points,
        section,
    })
}
