//! Prompt templates for the generation client.
//!
//! Centralizes every prompt sent to the provider so wording changes
//! never hide inside call sites. All builders are pure string functions.

use crate::outline::PageSpec;

/// Prompt asking the model to produce a deck outline for a free-form idea.
///
/// The model may answer in the simple or the part-based JSON format
/// (see [`crate::outline`]); both are advertised here.
pub fn outline_generation(idea: &str, extra_requirements: Option<&str>) -> String {
    let extra = match extra_requirements {
        Some(req) if !req.trim().is_empty() => {
            format!("\n\nAdditional requirements (must be followed):\n{req}\n")
        }
        _ => String::new(),
    };
    format!(
        "You are a helpful assistant that generates an outline for a slide deck.\n\
         \n\
         You can organize the content in two ways:\n\
         \n\
         1. Simple format (for short decks without major sections):\n\
         [{{\"title\": \"title1\", \"points\": [\"point1\", \"point2\"]}}, {{\"title\": \"title2\", \"points\": [\"point1\", \"point2\"]}}]\n\
         \n\
         2. Part-based format (for longer decks with major sections):\n\
         [{{\"part\": \"Part 1: Introduction\", \"pages\": [{{\"title\": \"Welcome\", \"points\": [\"point1\"]}}]}}]\n\
         \n\
         Choose the format that best fits the content. Use parts when the deck has clear major sections.\n\
         \n\
         The user's request: {idea}.{extra} Now generate the outline, don't include any other text."
    )
}

/// Prompt asking the model to structure a user-provided outline text
/// without rewriting any of its content.
pub fn outline_parsing(outline_text: &str) -> String {
    format!(
        "You are a helpful assistant that parses a user-provided slide deck outline into a structured format.\n\
         \n\
         The user has provided the following outline text:\n\
         \n\
         {outline_text}\n\
         \n\
         Convert it into the JSON outline format (simple or part-based) WITHOUT modifying, adding, or \
         removing any of the original text content. Only reorganize the existing content, preserving all \
         titles and points exactly as written. If the text has clear sections, use the part-based format.\n\
         \n\
         Return only the JSON, don't include any other text."
    )
}

/// Prompt for generating the text description of a single page.
///
/// `page_number` is 1-based, matching how a reader counts slides.
pub fn page_description(
    idea: &str,
    outline_text: &str,
    page: &PageSpec,
    page_number: usize,
) -> String {
    let part_info = match page.section.as_deref() {
        Some(section) => format!("\nThis page belongs to section: {section}\n"),
        None => String::new(),
    };
    let points = page.points.join("\n- ");
    format!(
        "We are generating the text description for each slide of a deck.\n\
         The original user request is:\n{idea}\n\
         We already have the entire outline:\n{outline_text}\n{part_info}\
         Now generate the description for page {page_number}:\n\
         Title: {title}\n\
         - {points}\n\
         The description includes the page title and the text to render (keep it concise); \
         don't include any other text. Keep any markdown image links from the points as page materials.",
        title = page.title,
    )
}

/// Prompt for rendering one full slide image from its description.
pub fn image_generation(
    page_description: &str,
    outline_text: &str,
    current_section: Option<&str>,
    has_material_images: bool,
    extra_requirements: Option<&str>,
) -> String {
    let section = current_section.unwrap_or("(no section)");
    let materials_note = if has_material_images {
        "\n\nNote: besides the template reference image (style reference), additional material \
         images are attached. Treat them as a palette of elements: pick suitable pictures, icons, \
         or charts from them and integrate them into the generated slide where the content calls for it."
    } else {
        ""
    };
    let extra = match extra_requirements {
        Some(req) if !req.trim().is_empty() => {
            format!("\n\nAdditional requirements (must be followed):\n{req}\n")
        }
        _ => String::new(),
    };
    format!(
        "Using professional graphic-design knowledge, generate one slide that matches the color \
         scheme and style of the reference image, as one page of a larger deck. The content is:\n\
         {page_description}\n\
         (keep the text content identical; bullets and layout may be polished)\n\
         \n\
         The outline of the whole deck is:\n{outline_text}\n\
         \n\
         Current section: {section}\n\
         \n\
         Text must be crisp and sharp, 4K resolution, 16:9 aspect ratio. Keep the visual style and \
         palette strictly consistent across the deck.{materials_note}{extra}"
    )
}

/// Prompt for editing an already-generated slide image in place.
pub fn image_edit(instruction: &str, original_description: Option<&str>) -> String {
    match original_description {
        Some(desc) => format!(
            "The original description of this slide is:\n{desc}\n\
             \n\
             Now modify the slide according to this instruction: {instruction}\n\
             \n\
             Keep the existing text content and design style; change only what the instruction asks for."
        ),
        None => format!(
            "Modify this slide according to the following instruction: {instruction}\n\
             Keep the existing content structure and design style; change only what the instruction asks for."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(section: Option<&str>) -> PageSpec {
        PageSpec {
            title: "Photosynthesis".into(),
            points: vec!["light".into(), "chlorophyll".into()],
            section: section.map(String::from),
        }
    }

    #[test]
    fn outline_prompt_embeds_idea() {
        let p = outline_generation("intro to photosynthesis", None);
        assert!(p.contains("intro to photosynthesis"));
        assert!(p.contains("Simple format"));
        assert!(p.contains("Part-based format"));
    }

    #[test]
    fn outline_prompt_includes_extra_requirements() {
        let p = outline_generation("idea", Some("exactly 5 pages"));
        assert!(p.contains("exactly 5 pages"));
    }

    #[test]
    fn outline_prompt_omits_blank_extra_requirements() {
        let p = outline_generation("idea", Some("   "));
        assert!(!p.contains("Additional requirements"));
    }

    #[test]
    fn description_prompt_carries_page_number_and_section() {
        let p = page_description("idea", "1. Photosynthesis", &page(Some("Part 2: Biology")), 3);
        assert!(p.contains("page 3"));
        assert!(p.contains("Part 2: Biology"));
        assert!(p.contains("Photosynthesis"));
        assert!(p.contains("- light"));
    }

    #[test]
    fn description_prompt_without_section() {
        let p = page_description("idea", "outline", &page(None), 1);
        assert!(!p.contains("belongs to section"));
    }

    #[test]
    fn image_prompt_mentions_materials_only_when_present() {
        let with = image_generation("desc", "outline", Some("Part 1"), true, None);
        let without = image_generation("desc", "outline", Some("Part 1"), false, None);
        assert!(with.contains("material"));
        assert!(!without.contains("material images are attached"));
    }

    #[test]
    fn edit_prompt_with_and_without_description() {
        let with = image_edit("darker background", Some("title page"));
        assert!(with.contains("title page"));
        assert!(with.contains("darker background"));
        let without = image_edit("darker background", None);
        assert!(without.contains("darker background"));
    }
}
