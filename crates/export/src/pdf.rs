//! PDF assembly: one full-bleed image per page.
//!
//! The document is written directly (catalog, page tree, one page +
//! content stream + image XObject per slide, xref table, trailer).
//! JPEG images are embedded as-is with DCTDecode; everything else is
//! decoded to RGB and Flate-compressed. Object numbering and stream
//! contents are fully determined by the input, so output is
//! byte-identical across runs.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use slidecraft_core::error::CoreError;

/// Page size in points, 16:9.
const PAGE_WIDTH: f64 = 960.0;
const PAGE_HEIGHT: f64 = 540.0;

/// An image prepared for embedding.
struct EmbeddedImage {
    width: u32,
    height: u32,
    filter: &'static str,
    data: Vec<u8>,
}

/// Build a PDF document from encoded slide images, in order.
pub fn build(images: &[Vec<u8>]) -> Result<Vec<u8>, CoreError> {
    let embedded: Vec<EmbeddedImage> = images
        .iter()
        .map(|img| prepare_image(img))
        .collect::<Result<_, _>>()?;

    let mut doc = Document::new();

    // Object layout: 1 = catalog, 2 = page tree, then per slide
    // (page, contents, image) in order.
    let catalog_id = 1u32;
    let pages_id = 2u32;
    let n = embedded.len() as u32;
    let page_id = |i: u32| 3 + i * 3;
    let contents_id = |i: u32| 4 + i * 3;
    let image_id = |i: u32| 5 + i * 3;

    doc.object(
        catalog_id,
        format!("<< /Type /Catalog /Pages {pages_id} 0 R >>").as_bytes(),
    );

    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", page_id(i))).collect();
    doc.object(
        pages_id,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {n} >>",
            kids.join(" ")
        )
        .as_bytes(),
    );

    for (i, img) in embedded.iter().enumerate() {
        let i = i as u32;
        doc.object(
            page_id(i),
            format!(
                "<< /Type /Page /Parent {pages_id} 0 R \
                 /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /XObject << /Im0 {} 0 R >> >> \
                 /Contents {} 0 R >>",
                image_id(i),
                contents_id(i)
            )
            .as_bytes(),
        );

        // Scale the unit image square over the whole page.
        let content = format!("q {PAGE_WIDTH} 0 0 {PAGE_HEIGHT} 0 0 cm /Im0 Do Q");
        doc.stream(contents_id(i), "", content.as_bytes());

        doc.stream(
            image_id(i),
            &format!(
                "/Type /XObject /Subtype /Image /Width {} /Height {} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /{} ",
                img.width, img.height, img.filter
            ),
            &img.data,
        );
    }

    Ok(doc.finish(catalog_id))
}

/// Decode-or-pass-through an image into an embeddable form.
fn prepare_image(bytes: &[u8]) -> Result<EmbeddedImage, CoreError> {
    let format = image::guess_format(bytes)
        .map_err(|e| CoreError::Internal(format!("pdf: unrecognized image data: {e}")))?;

    if format == image::ImageFormat::Jpeg {
        // JPEG streams embed directly; only the dimensions are needed.
        let (width, height) =
            image::ImageReader::with_format(std::io::Cursor::new(bytes), format)
                .into_dimensions()
                .map_err(|e| {
                    CoreError::Internal(format!("pdf: failed to read jpeg header: {e}"))
                })?;
        return Ok(EmbeddedImage {
            width,
            height,
            filter: "DCTDecode",
            data: bytes.to_vec(),
        });
    }

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| CoreError::Internal(format!("pdf: failed to decode image: {e}")))?
        .to_rgb8();
    let (width, height) = decoded.dimensions();

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(decoded.as_raw())
        .and_then(|()| encoder.finish())
        .map(|data| EmbeddedImage {
            width,
            height,
            filter: "FlateDecode",
            data,
        })
        .map_err(|e| CoreError::Internal(format!("pdf: failed to compress image: {e}")))
}

/// Incremental PDF writer tracking byte offsets for the xref table.
struct Document {
    buf: Vec<u8>,
    offsets: Vec<(u32, usize)>,
}

impl Document {
    fn new() -> Self {
        Self {
            buf: b"%PDF-1.4\n".to_vec(),
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, id: u32, body: &[u8]) {
        self.offsets.push((id, self.buf.len()));
        self.buf.extend_from_slice(format!("{id} 0 obj\n").as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: u32, dict_extra: &str, data: &[u8]) {
        self.offsets.push((id, self.buf.len()));
        self.buf.extend_from_slice(
            format!(
                "{id} 0 obj\n<< {dict_extra}/Length {} >>\nstream\n",
                data.len()
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self, root_id: u32) -> Vec<u8> {
        self.offsets.sort_by_key(|&(id, _)| id);
        let count = self.offsets.len() + 1;
        let xref_start = self.buf.len();

        self.buf
            .extend_from_slice(format!("xref\n0 {count}\n").as_bytes());
        self.buf.extend_from_slice(b"0000000000 65535 f \n");
        for &(_, offset) in &self.offsets {
            self.buf
                .extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        self.buf.extend_from_slice(
            format!(
                "trailer\n<< /Size {count} /Root {root_id} 0 R >>\nstartxref\n{xref_start}\n%%EOF\n"
            )
            .as_bytes(),
        );
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_images;

    #[test]
    fn document_has_one_page_per_image() {
        let images = vec![
            test_images::png(16, 9, [255, 0, 0]),
            test_images::png(16, 9, [0, 255, 0]),
        ];
        let bytes = build(&images).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Count 2"));
        assert_eq!(text.matches("/Type /Page ").count(), 2);
        assert!(text.contains("/MediaBox [0 0 960 540]"));
        assert!(text.ends_with("%%EOF\n"));
    }

    #[test]
    fn png_input_is_flate_encoded() {
        let bytes = build(&[test_images::png(8, 8, [1, 2, 3])]).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Filter /FlateDecode"));
        assert!(!text.contains("/Filter /DCTDecode"));
    }

    #[test]
    fn jpeg_input_embeds_directly() {
        let rgb = image::RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30]));
        let mut jpeg = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(rgb)
            .write_to(&mut jpeg, image::ImageFormat::Jpeg)
            .unwrap();
        let jpeg = jpeg.into_inner();

        let bytes = build(&[jpeg.clone()]).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("/Filter /DCTDecode"));
        // The jpeg bytes appear verbatim inside the stream.
        assert!(bytes
            .windows(jpeg.len())
            .any(|window| window == jpeg.as_slice()));
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let bytes = build(&[test_images::png(4, 4, [0, 0, 0])]).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        let xref_pos = text.rfind("xref\n").unwrap();
        let entries: Vec<&str> = text[xref_pos..]
            .lines()
            .skip(2)
            .take_while(|line| line.ends_with("n ") || line.ends_with("f "))
            .collect();
        // Free entry plus catalog, pages, page, contents, image.
        assert_eq!(entries.len(), 6);
        for entry in entries.iter().skip(1) {
            let offset: usize = entry[..10].parse().unwrap();
            assert!(bytes[offset..].starts_with(&bytes[offset..offset + 1]));
            let tail = String::from_utf8_lossy(&bytes[offset..offset + 12]);
            assert!(tail.contains(" 0 obj"), "offset {offset} not at an object");
        }
    }

    #[test]
    fn garbage_input_is_rejected() {
        assert!(build(&[b"not an image".to_vec()]).is_err());
    }
}
