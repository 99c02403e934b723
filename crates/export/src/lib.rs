//! Export assembler: turns the ordered set of completed page images into
//! a downloadable deck.
//!
//! The assembler is stateless and idempotent: the same images in the
//! same order always produce byte-identical output for a given format.
//! Callers (the API layer) are responsible for reading pages in
//! `order_index` order and skipping pages without a completed image.

pub mod pdf;
pub mod pptx;

use slidecraft_core::error::CoreError;

/// Target container format for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pptx,
    Pdf,
}

impl ExportFormat {
    /// Parse the URL path segment (`"pptx"` / `"pdf"`).
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "pptx" => Ok(Self::Pptx),
            "pdf" => Ok(Self::Pdf),
            other => Err(CoreError::Validation(format!(
                "Unknown export format '{other}'. Must be one of: pptx, pdf"
            ))),
        }
    }

    /// MIME type of the produced byte stream.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Pdf => "application/pdf",
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pptx => "pptx",
            Self::Pdf => "pdf",
        }
    }
}

/// Assemble a deck from encoded slide images, one slide per image, in
/// the given order.
///
/// Fails with [`CoreError::NoContent`] when `images` is empty; a partial
/// set (pages still generating or failed were skipped upstream) is fine.
pub fn export_deck(images: &[Vec<u8>], format: ExportFormat) -> Result<Vec<u8>, CoreError> {
    if images.is_empty() {
        return Err(CoreError::NoContent(
            "project has no completed page images".to_string(),
        ));
    }
    tracing::debug!(slides = images.len(), format = ?format, "Assembling deck");
    match format {
        ExportFormat::Pptx => pptx::build(images),
        ExportFormat::Pdf => pdf::build(images),
    }
}

#[cfg(test)]
pub(crate) mod test_images {
    use std::io::Cursor;

    /// Encode a solid-color PNG for tests.
    pub fn png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn format_parsing() {
        assert_eq!(ExportFormat::from_str("pptx").unwrap(), ExportFormat::Pptx);
        assert_eq!(ExportFormat::from_str("pdf").unwrap(), ExportFormat::Pdf);
        assert!(ExportFormat::from_str("docx").is_err());
    }

    #[test]
    fn empty_deck_is_no_content() {
        assert_matches!(
            export_deck(&[], ExportFormat::Pptx),
            Err(CoreError::NoContent(_))
        );
        assert_matches!(
            export_deck(&[], ExportFormat::Pdf),
            Err(CoreError::NoContent(_))
        );
    }

    #[test]
    fn export_is_deterministic_per_format() {
        let images = vec![
            test_images::png(32, 18, [200, 0, 0]),
            test_images::png(32, 18, [0, 200, 0]),
        ];
        for format in [ExportFormat::Pptx, ExportFormat::Pdf] {
            let a = export_deck(&images, format).unwrap();
            let b = export_deck(&images, format).unwrap();
            assert_eq!(a, b, "{format:?} export must be byte-identical");
        }
    }

    #[test]
    fn formats_differ() {
        let images = vec![test_images::png(32, 18, [1, 2, 3])];
        let pptx = export_deck(&images, ExportFormat::Pptx).unwrap();
        let pdf = export_deck(&images, ExportFormat::Pdf).unwrap();
        assert_ne!(pptx, pdf);
        assert!(pdf.starts_with(b"%PDF-"));
        // Zip local file header magic.
        assert!(pptx.starts_with(b"PK\x03\x04"));
    }
}
