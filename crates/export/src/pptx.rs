//! PPTX assembly: a minimal OOXML presentation package with one
//! full-bleed picture per slide.
//!
//! The package is built by hand (the parts are small and fixed) and
//! written through the `zip` crate with pinned entry metadata so the
//! output is byte-identical across runs.

use std::io::{Cursor, Write};

use slidecraft_core::error::CoreError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Slide size in EMU, 16:9.
const SLIDE_CX: u64 = 12_192_000;
const SLIDE_CY: u64 = 6_858_000;

/// Build a PPTX package from encoded slide images, in order.
pub fn build(images: &[Vec<u8>]) -> Result<Vec<u8>, CoreError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    // Fixed timestamp (zip epoch) keeps the container deterministic.
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let exts: Vec<&str> = images.iter().map(|img| image_extension(img)).collect();

    let mut add = |name: &str, content: &[u8]| -> Result<(), CoreError> {
        zip.start_file(name, options)
            .map_err(|e| CoreError::Internal(format!("pptx: failed to add {name}: {e}")))?;
        zip.write_all(content)
            .map_err(|e| CoreError::Internal(format!("pptx: failed to write {name}: {e}")))?;
        Ok(())
    };

    add("[Content_Types].xml", content_types(&exts).as_bytes())?;
    add("_rels/.rels", ROOT_RELS.as_bytes())?;
    add("ppt/presentation.xml", presentation(images.len()).as_bytes())?;
    add(
        "ppt/_rels/presentation.xml.rels",
        presentation_rels(images.len()).as_bytes(),
    )?;
    add("ppt/slideMasters/slideMaster1.xml", SLIDE_MASTER.as_bytes())?;
    add(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        SLIDE_MASTER_RELS.as_bytes(),
    )?;
    add("ppt/slideLayouts/slideLayout1.xml", SLIDE_LAYOUT.as_bytes())?;
    add(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        SLIDE_LAYOUT_RELS.as_bytes(),
    )?;
    add("ppt/theme/theme1.xml", THEME.as_bytes())?;

    for (i, (img, ext)) in images.iter().zip(&exts).enumerate() {
        let n = i + 1;
        add(&format!("ppt/slides/slide{n}.xml"), slide().as_bytes())?;
        add(
            &format!("ppt/slides/_rels/slide{n}.xml.rels"),
            slide_rels(n, ext).as_bytes(),
        )?;
        add(&format!("ppt/media/image{n}.{ext}"), img)?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| CoreError::Internal(format!("pptx: failed to finalize package: {e}")))?;
    Ok(cursor.into_inner())
}

/// Pick the media file extension from the image's magic bytes.
/// Unknown formats are stored as png; the provider emits PNG by default.
fn image_extension(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => "jpeg",
        Ok(image::ImageFormat::WebP) => "webp",
        _ => "png",
    }
}

fn content_types(exts: &[&str]) -> String {
    let mut defaults = String::from(
        "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>",
    );
    for ext in ["png", "jpeg", "webp"] {
        if exts.contains(&ext) {
            defaults.push_str(&format!(
                "<Default Extension=\"{ext}\" ContentType=\"image/{ext}\"/>"
            ));
        }
    }

    let mut overrides = String::from(
        "<Override PartName=\"/ppt/presentation.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml\"/>\
         <Override PartName=\"/ppt/slideMasters/slideMaster1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml\"/>\
         <Override PartName=\"/ppt/slideLayouts/slideLayout1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml\"/>\
         <Override PartName=\"/ppt/theme/theme1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.theme+xml\"/>",
    );
    for n in 1..=exts.len() {
        overrides.push_str(&format!(
            "<Override PartName=\"/ppt/slides/slide{n}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slide+xml\"/>"
        ));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">{defaults}{overrides}</Types>"
    )
}

const ROOT_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
    <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
    <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"ppt/presentation.xml\"/>\
    </Relationships>";

fn presentation(slide_count: usize) -> String {
    let slide_ids: String = (1..=slide_count)
        .map(|n| format!("<p:sldId id=\"{}\" r:id=\"rId{}\"/>", 255 + n, n + 1))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <p:presentation xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
         xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\">\
         <p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>\
         <p:sldIdLst>{slide_ids}</p:sldIdLst>\
         <p:sldSz cx=\"{SLIDE_CX}\" cy=\"{SLIDE_CY}\"/>\
         <p:notesSz cx=\"{SLIDE_CY}\" cy=\"{SLIDE_CX}\"/>\
         </p:presentation>"
    )
}

fn presentation_rels(slide_count: usize) -> String {
    let mut rels = String::from(
        "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster\" Target=\"slideMasters/slideMaster1.xml\"/>",
    );
    for n in 1..=slide_count {
        rels.push_str(&format!(
            "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide\" Target=\"slides/slide{n}.xml\"/>",
            n + 1
        ));
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">{rels}</Relationships>"
    )
}

/// One slide: a single picture stretched over the whole slide area.
fn slide() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <p:sld xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
         xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\">\
         <p:cSld><p:spTree>\
         <p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>\
         <p:grpSpPr/>\
         <p:pic>\
         <p:nvPicPr><p:cNvPr id=\"2\" name=\"Page Image\"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr>\
         <p:blipFill><a:blip r:embed=\"rId2\"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>\
         <p:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{SLIDE_CX}\" cy=\"{SLIDE_CY}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></p:spPr>\
         </p:pic>\
         </p:spTree></p:cSld>\
         </p:sld>"
    )
}

fn slide_rels(n: usize, ext: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout\" Target=\"../slideLayouts/slideLayout1.xml\"/>\
         <Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/image\" Target=\"../media/image{n}.{ext}\"/>\
         </Relationships>"
    )
}

const SLIDE_MASTER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
    <p:sldMaster xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
    xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
    xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\">\
    <p:cSld><p:spTree>\
    <p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>\
    <p:grpSpPr/>\
    </p:spTree></p:cSld>\
    <p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" \
    accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" hlink=\"hlink\" folHlink=\"folHlink\"/>\
    <p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/></p:sldLayoutIdLst>\
    </p:sldMaster>";

const SLIDE_MASTER_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
    <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
    <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout\" Target=\"../slideLayouts/slideLayout1.xml\"/>\
    <Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme\" Target=\"../theme/theme1.xml\"/>\
    </Relationships>";

const SLIDE_LAYOUT: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
    <p:sldLayout xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
    xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
    xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\" type=\"blank\">\
    <p:cSld><p:spTree>\
    <p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>\
    <p:grpSpPr/>\
    </p:spTree></p:cSld>\
    </p:sldLayout>";

const SLIDE_LAYOUT_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
    <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
    <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster\" Target=\"../slideMasters/slideMaster1.xml\"/>\
    </Relationships>";

const THEME: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
    <a:theme xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" name=\"Office\">\
    <a:themeElements>\
    <a:clrScheme name=\"Office\">\
    <a:dk1><a:sysClr val=\"windowText\" lastClr=\"000000\"/></a:dk1>\
    <a:lt1><a:sysClr val=\"window\" lastClr=\"FFFFFF\"/></a:lt1>\
    <a:dk2><a:srgbClr val=\"44546A\"/></a:dk2>\
    <a:lt2><a:srgbClr val=\"E7E6E6\"/></a:lt2>\
    <a:accent1><a:srgbClr val=\"4472C4\"/></a:accent1>\
    <a:accent2><a:srgbClr val=\"ED7D31\"/></a:accent2>\
    <a:accent3><a:srgbClr val=\"A5A5A5\"/></a:accent3>\
    <a:accent4><a:srgbClr val=\"FFC000\"/></a:accent4>\
    <a:accent5><a:srgbClr val=\"5B9BD5\"/></a:accent5>\
    <a:accent6><a:srgbClr val=\"70AD47\"/></a:accent6>\
    <a:hlink><a:srgbClr val=\"0563C1\"/></a:hlink>\
    <a:folHlink><a:srgbClr val=\"954F72\"/></a:folHlink>\
    </a:clrScheme>\
    <a:fontScheme name=\"Office\">\
    <a:majorFont><a:latin typeface=\"Calibri Light\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:majorFont>\
    <a:minorFont><a:latin typeface=\"Calibri\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:minorFont>\
    </a:fontScheme>\
    <a:fmtScheme name=\"Office\">\
    <a:fillStyleLst>\
    <a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>\
    <a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>\
    <a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>\
    </a:fillStyleLst>\
    <a:lnStyleLst>\
    <a:ln w=\"6350\"><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln>\
    <a:ln w=\"12700\"><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln>\
    <a:ln w=\"19050\"><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln>\
    </a:lnStyleLst>\
    <a:effectStyleLst>\
    <a:effectStyle><a:effectLst/></a:effectStyle>\
    <a:effectStyle><a:effectLst/></a:effectStyle>\
    <a:effectStyle><a:effectLst/></a:effectStyle>\
    </a:effectStyleLst>\
    <a:bgFillStyleLst>\
    <a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>\
    <a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>\
    <a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>\
    </a:bgFillStyleLst>\
    </a:fmtScheme>\
    </a:themeElements>\
    </a:theme>";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_images;
    use std::io::Read;

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn package_contains_one_slide_per_image() {
        let images = vec![
            test_images::png(16, 9, [255, 0, 0]),
            test_images::png(16, 9, [0, 255, 0]),
            test_images::png(16, 9, [0, 0, 255]),
        ];
        let bytes = build(&images).unwrap();
        let names = entry_names(&bytes);
        assert!(names.contains(&"ppt/slides/slide1.xml".to_string()));
        assert!(names.contains(&"ppt/slides/slide3.xml".to_string()));
        assert!(!names.contains(&"ppt/slides/slide4.xml".to_string()));
        assert!(names.contains(&"ppt/media/image2.png".to_string()));
        assert!(names.contains(&"ppt/slideMasters/slideMaster1.xml".to_string()));
        assert!(names.contains(&"ppt/theme/theme1.xml".to_string()));
    }

    #[test]
    fn media_round_trips_unmodified() {
        let img = test_images::png(16, 9, [9, 8, 7]);
        let bytes = build(&[img.clone()]).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut media = Vec::new();
        archive
            .by_name("ppt/media/image1.png")
            .unwrap()
            .read_to_end(&mut media)
            .unwrap();
        assert_eq!(media, img);
    }

    #[test]
    fn presentation_lists_slides_in_order() {
        let xml = presentation(2);
        let first = xml.find("r:id=\"rId2\"").unwrap();
        let second = xml.find("r:id=\"rId3\"").unwrap();
        assert!(first < second);
        assert!(xml.contains("cx=\"12192000\" cy=\"6858000\""));
    }

    #[test]
    fn content_types_covers_only_present_extensions() {
        let ct = content_types(&["png", "png"]);
        assert!(ct.contains("Extension=\"png\""));
        assert!(!ct.contains("Extension=\"jpeg\""));
    }
}
