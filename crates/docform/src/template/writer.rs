//! Serialises styled blocks into a WordprocessingML package.

use std::collections::BTreeSet;
use std::io::{self, Cursor, Write};

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::document::{Cell, Image, ImageKind, Run, Table};
use crate::error::ProcessError;
use crate::template::styles::{
    pt_to_half_points, pt_to_twips, ParagraphRole, TemplateStyle, TWIPS_PER_INCH,
};
use crate::template::StyledBlock;

type XmlWriter = Writer<Vec<u8>>;

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_FOOTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const STYLES_REL_ID: &str = "rId1";
const FOOTER_REL_ID: &str = "rId2";

/// English Metric Units per twip.
const EMU_PER_TWIP: u64 = 635;

/// A picture stored under `word/media/`, numbered from 1 in body order.
struct MediaPart<'a> {
    index: usize,
    image: &'a Image,
}

impl MediaPart<'_> {
    fn rel_id(&self) -> String {
        // rId1 and rId2 are the styles and footer.
        format!("rId{}", self.index + 2)
    }

    fn file_name(&self) -> String {
        format!("image{}.{}", self.index, self.image.kind.extension())
    }

    fn target(&self) -> String {
        format!("media/{}", self.file_name())
    }
}

fn media_parts(blocks: &[StyledBlock]) -> Vec<MediaPart<'_>> {
    blocks
        .iter()
        .filter_map(|block| match block {
            StyledBlock::Image(image) => Some(image),
            _ => None,
        })
        .enumerate()
        .map(|(i, image)| MediaPart {
            index: i + 1,
            image,
        })
        .collect()
}

/// Package-level metadata written to `docProps/core.xml`.
#[derive(Debug, Clone)]
pub struct PackageInfo {
    pub title: String,
    pub created: DateTime<Utc>,
}

impl PackageInfo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            created: Utc::now(),
        }
    }
}

/// Builds the complete `.docx` archive in memory.
pub fn write_package(
    blocks: &[StyledBlock],
    style: &TemplateStyle,
    info: &PackageInfo,
) -> Result<Vec<u8>, ProcessError> {
    let media = media_parts(blocks);

    let parts: [(&str, Vec<u8>); 7] = [
        ("[Content_Types].xml", content_types(&media).map_err(formatting)?),
        ("_rels/.rels", package_rels().map_err(formatting)?),
        ("docProps/core.xml", core_properties(info).map_err(formatting)?),
        (
            "word/_rels/document.xml.rels",
            document_rels(&media).map_err(formatting)?,
        ),
        ("word/styles.xml", styles_xml(style).map_err(formatting)?),
        ("word/footer1.xml", footer_xml(style).map_err(formatting)?),
        (
            "word/document.xml",
            document_xml(blocks, &media, style).map_err(formatting)?,
        ),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, content) in parts {
        zip.start_file(name, options)
            .map_err(|e| ProcessError::Formatting(e.to_string()))?;
        zip.write_all(&content).map_err(formatting)?;
    }

    // Already compressed formats are stored as they are.
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for part in &media {
        zip.start_file(format!("word/{}", part.target()), stored)
            .map_err(|e| ProcessError::Formatting(e.to_string()))?;
        zip.write_all(&part.image.data).map_err(formatting)?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| ProcessError::Formatting(e.to_string()))?;
    Ok(cursor.into_inner())
}

fn formatting(e: io::Error) -> ProcessError {
    ProcessError::Formatting(e.to_string())
}

fn new_part() -> io::Result<XmlWriter> {
    let mut w = Writer::new(Vec::new());
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(w)
}

fn content_types(media: &[MediaPart<'_>]) -> io::Result<Vec<u8>> {
    let image_kinds: BTreeSet<ImageKind> = media.iter().map(|part| part.image.kind).collect();
    let mut w = new_part()?;
    w.create_element("Types")
        .with_attribute(("xmlns", NS_CONTENT_TYPES))
        .write_inner_content(|w| {
            for (ext, content_type) in [
                ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
                ("xml", "application/xml"),
            ] {
                w.create_element("Default")
                    .with_attributes([("Extension", ext), ("ContentType", content_type)])
                    .write_empty()?;
            }
            for kind in &image_kinds {
                let content_type = kind.content_type();
                w.create_element("Default")
                    .with_attributes([
                        ("Extension", kind.extension()),
                        ("ContentType", content_type.as_str()),
                    ])
                    .write_empty()?;
            }
            for (part, content_type) in [
                (
                    "/word/document.xml",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
                ),
                (
                    "/word/styles.xml",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
                ),
                (
                    "/word/footer1.xml",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml",
                ),
                (
                    "/docProps/core.xml",
                    "application/vnd.openxmlformats-package.core-properties+xml",
                ),
            ] {
                w.create_element("Override")
                    .with_attributes([("PartName", part), ("ContentType", content_type)])
                    .write_empty()?;
            }
            Ok(())
        })?;
    Ok(w.into_inner())
}

fn relationships(entries: &[(&str, &str, &str)]) -> io::Result<Vec<u8>> {
    let mut w = new_part()?;
    w.create_element("Relationships")
        .with_attribute(("xmlns", NS_PKG_REL))
        .write_inner_content(|w| {
            for (id, rel_type, target) in entries {
                w.create_element("Relationship")
                    .with_attributes([("Id", *id), ("Type", *rel_type), ("Target", *target)])
                    .write_empty()?;
            }
            Ok(())
        })?;
    Ok(w.into_inner())
}

fn package_rels() -> io::Result<Vec<u8>> {
    relationships(&[
        ("rId1", REL_OFFICE_DOCUMENT, "word/document.xml"),
        ("rId2", REL_CORE_PROPERTIES, "docProps/core.xml"),
    ])
}

fn document_rels(media: &[MediaPart<'_>]) -> io::Result<Vec<u8>> {
    let images: Vec<(String, String)> = media
        .iter()
        .map(|part| (part.rel_id(), part.target()))
        .collect();

    let mut entries = vec![
        (STYLES_REL_ID, REL_STYLES, "styles.xml"),
        (FOOTER_REL_ID, REL_FOOTER, "footer1.xml"),
    ];
    entries.extend(
        images
            .iter()
            .map(|(id, target)| (id.as_str(), REL_IMAGE, target.as_str())),
    );
    relationships(&entries)
}

fn core_properties(info: &PackageInfo) -> io::Result<Vec<u8>> {
    let timestamp = info.created.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let mut w = new_part()?;
    w.create_element("cp:coreProperties")
        .with_attributes([
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ])
        .write_inner_content(|w| {
            w.create_element("dc:title")
                .write_text_content(BytesText::new(&info.title))?;
            w.create_element("dc:creator")
                .write_text_content(BytesText::new("docform"))?;
            for name in ["dcterms:created", "dcterms:modified"] {
                w.create_element(name)
                    .with_attribute(("xsi:type", "dcterms:W3CDTF"))
                    .write_text_content(BytesText::new(&timestamp))?;
            }
            Ok(())
        })?;
    Ok(w.into_inner())
}

fn write_fonts(w: &mut XmlWriter, font: &str) -> io::Result<()> {
    w.create_element("w:rFonts")
        .with_attributes([
            ("w:ascii", font),
            ("w:hAnsi", font),
            ("w:eastAsia", font),
            ("w:cs", font),
        ])
        .write_empty()?;
    Ok(())
}

fn write_val(w: &mut XmlWriter, name: &str, value: &str) -> io::Result<()> {
    w.create_element(name)
        .with_attribute(("w:val", value))
        .write_empty()?;
    Ok(())
}

fn write_spacing(w: &mut XmlWriter, before_twips: u32, after_twips: u32) -> io::Result<()> {
    let before = before_twips.to_string();
    let after = after_twips.to_string();
    w.create_element("w:spacing")
        .with_attributes([("w:before", before.as_str()), ("w:after", after.as_str())])
        .write_empty()?;
    Ok(())
}

fn write_paragraph_style(
    w: &mut XmlWriter,
    role: ParagraphRole,
    name: &str,
    style: &TemplateStyle,
    outline_level: Option<&str>,
) -> io::Result<()> {
    let text_style = style.text_style(role);
    let mut element = w
        .create_element("w:style")
        .with_attributes([("w:type", "paragraph"), ("w:styleId", role.style_id())]);
    if role == ParagraphRole::Body {
        element = element.with_attribute(("w:default", "1"));
    }
    element.write_inner_content(|w| {
        write_val(w, "w:name", name)?;
        if role != ParagraphRole::Body {
            write_val(w, "w:basedOn", ParagraphRole::Body.style_id())?;
            write_val(w, "w:next", ParagraphRole::Body.style_id())?;
        }
        w.create_element("w:qFormat").write_empty()?;
        w.create_element("w:pPr").write_inner_content(|w| {
            if text_style.keep_with_next {
                w.create_element("w:keepNext").write_empty()?;
            }
            write_spacing(w, 0, pt_to_twips(text_style.space_after_pt))?;
            if let Some(level) = outline_level {
                write_val(w, "w:outlineLvl", level)?;
            }
            Ok(())
        })?;
        w.create_element("w:rPr").write_inner_content(|w| {
            write_fonts(w, &style.font_family)?;
            if text_style.bold {
                w.create_element("w:b").write_empty()?;
            }
            write_val(w, "w:color", &style.color)?;
            let size = pt_to_half_points(text_style.size_pt).to_string();
            write_val(w, "w:sz", &size)?;
            write_val(w, "w:szCs", &size)?;
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

fn styles_xml(style: &TemplateStyle) -> io::Result<Vec<u8>> {
    let mut w = new_part()?;
    w.create_element("w:styles")
        .with_attribute(("xmlns:w", NS_W))
        .write_inner_content(|w| {
            w.create_element("w:docDefaults").write_inner_content(|w| {
                w.create_element("w:rPrDefault").write_inner_content(|w| {
                    w.create_element("w:rPr").write_inner_content(|w| {
                        write_fonts(w, &style.font_family)?;
                        write_val(w, "w:color", &style.color)?;
                        let size = pt_to_half_points(style.body.size_pt).to_string();
                        write_val(w, "w:sz", &size)?;
                        write_val(w, "w:szCs", &size)?;
                        Ok(())
                    })?;
                    Ok(())
                })?;
                w.create_element("w:pPrDefault").write_inner_content(|w| {
                    w.create_element("w:pPr").write_inner_content(|w| {
                        write_spacing(w, 0, pt_to_twips(style.body.space_after_pt))
                    })?;
                    Ok(())
                })?;
                Ok(())
            })?;

            write_paragraph_style(w, ParagraphRole::Body, "Normal", style, None)?;
            write_paragraph_style(w, ParagraphRole::Heading, "heading 1", style, Some("0"))?;
            write_paragraph_style(w, ParagraphRole::Subheading, "heading 2", style, Some("1"))?;

            w.create_element("w:style")
                .with_attributes([("w:type", "table"), ("w:styleId", "TableGrid")])
                .write_inner_content(|w| {
                    write_val(w, "w:name", "Table Grid")?;
                    w.create_element("w:tblPr").write_inner_content(|w| {
                        write_borders(
                            w,
                            "w:tblBorders",
                            &style.color,
                            &[
                                ("w:top", style.table.outer_border_size),
                                ("w:left", style.table.outer_border_size),
                                ("w:bottom", style.table.outer_border_size),
                                ("w:right", style.table.outer_border_size),
                                ("w:insideH", style.table.inner_border_size),
                                ("w:insideV", style.table.inner_border_size),
                            ],
                        )
                    })?;
                    Ok(())
                })?;
            Ok(())
        })?;
    Ok(w.into_inner())
}

fn write_borders(
    w: &mut XmlWriter,
    container: &str,
    color: &str,
    edges: &[(&str, u32)],
) -> io::Result<()> {
    w.create_element(container).write_inner_content(|w| {
        for (edge, size) in edges {
            let size = size.to_string();
            w.create_element(*edge)
                .with_attributes([
                    ("w:val", "single"),
                    ("w:sz", size.as_str()),
                    ("w:space", "0"),
                    ("w:color", color),
                ])
                .write_empty()?;
        }
        Ok(())
    })?;
    Ok(())
}

fn footer_xml(style: &TemplateStyle) -> io::Result<Vec<u8>> {
    let size = pt_to_half_points(style.footer_size_pt).to_string();
    let run_props = |w: &mut XmlWriter| -> io::Result<()> {
        w.create_element("w:rPr").write_inner_content(|w| {
            write_val(w, "w:color", &style.color)?;
            write_val(w, "w:sz", &size)?;
            Ok(())
        })?;
        Ok(())
    };

    let mut w = new_part()?;
    w.create_element("w:ftr")
        .with_attributes([("xmlns:w", NS_W), ("xmlns:r", NS_R)])
        .write_inner_content(|w| {
            w.create_element("w:p").write_inner_content(|w| {
                w.create_element("w:pPr").write_inner_content(|w| {
                    write_spacing(w, 0, 0)?;
                    write_val(w, "w:jc", "center")
                })?;
                w.create_element("w:r").write_inner_content(|w| {
                    run_props(w)?;
                    w.create_element("w:t")
                        .with_attribute(("xml:space", "preserve"))
                        .write_text_content(BytesText::new("Page "))?;
                    Ok(())
                })?;
                for field_char in ["begin", "instr", "separate", "placeholder", "end"] {
                    w.create_element("w:r").write_inner_content(|w| {
                        run_props(w)?;
                        match field_char {
                            "instr" => {
                                w.create_element("w:instrText")
                                    .with_attribute(("xml:space", "preserve"))
                                    .write_text_content(BytesText::new(" PAGE "))?;
                            }
                            "placeholder" => {
                                w.create_element("w:t")
                                    .write_text_content(BytesText::new("1"))?;
                            }
                            kind => {
                                w.create_element("w:fldChar")
                                    .with_attribute(("w:fldCharType", kind))
                                    .write_empty()?;
                            }
                        }
                        Ok(())
                    })?;
                }
                Ok(())
            })?;
            Ok(())
        })?;
    Ok(w.into_inner())
}

/// Character formatting resolved for one output run.
struct RunFormat<'a> {
    font: &'a str,
    color: &'a str,
    size_pt: u32,
    bold: bool,
    italic: bool,
    underline: bool,
}

fn write_run(w: &mut XmlWriter, text: &str, format: &RunFormat<'_>) -> io::Result<()> {
    w.create_element("w:r").write_inner_content(|w| {
        w.create_element("w:rPr").write_inner_content(|w| {
            write_fonts(w, format.font)?;
            if format.bold {
                w.create_element("w:b").write_empty()?;
            }
            if format.italic {
                w.create_element("w:i").write_empty()?;
            }
            write_val(w, "w:color", format.color)?;
            let size = pt_to_half_points(format.size_pt).to_string();
            write_val(w, "w:sz", &size)?;
            write_val(w, "w:szCs", &size)?;
            if format.underline {
                write_val(w, "w:u", "single")?;
            }
            Ok(())
        })?;
        write_text(w, text)
    })?;
    Ok(())
}

/// Writes run content, turning tabs and line breaks into their elements.
fn write_text(w: &mut XmlWriter, text: &str) -> io::Result<()> {
    for (line_index, line) in text.split('\n').enumerate() {
        if line_index > 0 {
            w.create_element("w:br").write_empty()?;
        }
        for (segment_index, segment) in line.split('\t').enumerate() {
            if segment_index > 0 {
                w.create_element("w:tab").write_empty()?;
            }
            if !segment.is_empty() {
                w.create_element("w:t")
                    .with_attribute(("xml:space", "preserve"))
                    .write_text_content(BytesText::new(segment))?;
            }
        }
    }
    Ok(())
}

fn write_body_paragraph(
    w: &mut XmlWriter,
    role: ParagraphRole,
    runs: &[Run],
    style: &TemplateStyle,
) -> io::Result<()> {
    let text_style = style.text_style(role);
    w.create_element("w:p").write_inner_content(|w| {
        w.create_element("w:pPr").write_inner_content(|w| {
            write_val(w, "w:pStyle", role.style_id())?;
            if text_style.keep_with_next {
                w.create_element("w:keepNext").write_empty()?;
            }
            write_spacing(w, 0, pt_to_twips(text_style.space_after_pt))?;
            write_val(w, "w:jc", "left")
        })?;
        for run in runs {
            let format = RunFormat {
                font: &style.font_family,
                color: &style.color,
                size_pt: text_style.size_pt,
                bold: text_style.bold || run.bold,
                italic: run.italic,
                underline: run.underline,
            };
            write_run(w, &run.text, &format)?;
        }
        Ok(())
    })?;
    Ok(())
}

/// Drawn size in EMUs: the natural size at the template resolution, scaled
/// down to fit the allowed width and the page height.
fn image_extent(image: &Image, style: &TemplateStyle) -> (u64, u64) {
    let pixels_w = u64::from(image.width.max(1));
    let pixels_h = u64::from(image.height.max(1));
    let twips_per_pixel = u64::from(TWIPS_PER_INCH / style.image.pixels_per_inch.max(1));

    let max_w = u64::from(style.image.max_width_twips.min(style.page.text_width_twips()));
    let max_h = u64::from(style.page.text_height_twips());

    let mut width = (pixels_w * twips_per_pixel).min(max_w);
    let mut height = width * pixels_h / pixels_w;
    if height > max_h {
        height = max_h;
        width = height * pixels_w / pixels_h;
    }
    (width.max(1) * EMU_PER_TWIP, height.max(1) * EMU_PER_TWIP)
}

fn write_image(w: &mut XmlWriter, part: &MediaPart<'_>, style: &TemplateStyle) -> io::Result<()> {
    let (cx, cy) = image_extent(part.image, style);
    let (cx, cy) = (cx.to_string(), cy.to_string());
    let id = part.index.to_string();
    let name = part.file_name();
    let rel_id = part.rel_id();

    w.create_element("w:p").write_inner_content(|w| {
        w.create_element("w:pPr").write_inner_content(|w| {
            write_spacing(w, 0, pt_to_twips(style.image.space_after_pt))?;
            write_val(w, "w:jc", "center")
        })?;
        w.create_element("w:r").write_inner_content(|w| {
            w.create_element("w:drawing").write_inner_content(|w| {
                w.create_element("wp:inline")
                    .with_attributes([("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")])
                    .write_inner_content(|w| {
                        w.create_element("wp:extent")
                            .with_attributes([("cx", cx.as_str()), ("cy", cy.as_str())])
                            .write_empty()?;
                        w.create_element("wp:docPr")
                            .with_attributes([("id", id.as_str()), ("name", name.as_str())])
                            .write_empty()?;
                        w.create_element("wp:cNvGraphicFramePr").write_inner_content(|w| {
                            w.create_element("a:graphicFrameLocks")
                                .with_attribute(("noChangeAspect", "1"))
                                .write_empty()?;
                            Ok(())
                        })?;
                        w.create_element("a:graphic").write_inner_content(|w| {
                            w.create_element("a:graphicData")
                                .with_attribute(("uri", NS_PIC))
                                .write_inner_content(|w| {
                                    write_picture(w, &id, &name, &rel_id, &cx, &cy)
                                })?;
                            Ok(())
                        })?;
                        Ok(())
                    })?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

fn write_picture(
    w: &mut XmlWriter,
    id: &str,
    name: &str,
    rel_id: &str,
    cx: &str,
    cy: &str,
) -> io::Result<()> {
    w.create_element("pic:pic").write_inner_content(|w| {
        w.create_element("pic:nvPicPr").write_inner_content(|w| {
            w.create_element("pic:cNvPr")
                .with_attributes([("id", id), ("name", name)])
                .write_empty()?;
            w.create_element("pic:cNvPicPr").write_empty()?;
            Ok(())
        })?;
        w.create_element("pic:blipFill").write_inner_content(|w| {
            w.create_element("a:blip")
                .with_attribute(("r:embed", rel_id))
                .write_empty()?;
            w.create_element("a:stretch").write_inner_content(|w| {
                w.create_element("a:fillRect").write_empty()?;
                Ok(())
            })?;
            Ok(())
        })?;
        w.create_element("pic:spPr").write_inner_content(|w| {
            w.create_element("a:xfrm").write_inner_content(|w| {
                w.create_element("a:off")
                    .with_attributes([("x", "0"), ("y", "0")])
                    .write_empty()?;
                w.create_element("a:ext")
                    .with_attributes([("cx", cx), ("cy", cy)])
                    .write_empty()?;
                Ok(())
            })?;
            w.create_element("a:prstGeom")
                .with_attribute(("prst", "rect"))
                .write_inner_content(|w| {
                    w.create_element("a:avLst").write_empty()?;
                    Ok(())
                })?;
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

fn write_spacer(w: &mut XmlWriter, style: &TemplateStyle) -> io::Result<()> {
    w.create_element("w:p").write_inner_content(|w| {
        w.create_element("w:pPr")
            .write_inner_content(|w| write_spacing(w, 0, pt_to_twips(style.table.spacer_after_pt)))?;
        Ok(())
    })?;
    Ok(())
}

struct CellPosition {
    row: usize,
    column: usize,
    rows: usize,
    columns: usize,
}

impl CellPosition {
    fn border_sizes(&self, style: &TemplateStyle) -> [(&'static str, u32); 4] {
        let size = |outer: bool| {
            if outer {
                style.table.outer_border_size
            } else {
                style.table.inner_border_size
            }
        };
        [
            ("w:top", size(self.row == 0)),
            ("w:left", size(self.column == 0)),
            ("w:bottom", size(self.row + 1 == self.rows)),
            ("w:right", size(self.column + 1 == self.columns)),
        ]
    }
}

fn write_cell(
    w: &mut XmlWriter,
    cell: Option<&Cell>,
    position: &CellPosition,
    width_twips: u32,
    style: &TemplateStyle,
) -> io::Result<()> {
    let header = position.row == 0;
    let spacing = pt_to_twips(style.table.cell_spacing_pt);
    let width = width_twips.to_string();
    let paragraphs = cell.map(|c| c.paragraphs.as_slice()).unwrap_or(&[]);

    w.create_element("w:tc").write_inner_content(|w| {
        w.create_element("w:tcPr").write_inner_content(|w| {
            w.create_element("w:tcW")
                .with_attributes([("w:w", width.as_str()), ("w:type", "dxa")])
                .write_empty()?;
            write_borders(w, "w:tcBorders", &style.color, &position.border_sizes(style))
        })?;

        let write_cell_paragraph = |w: &mut XmlWriter, runs: &[Run]| -> io::Result<()> {
            w.create_element("w:p").write_inner_content(|w| {
                w.create_element("w:pPr").write_inner_content(|w| {
                    write_spacing(w, spacing, spacing)?;
                    write_val(w, "w:jc", "center")
                })?;
                for run in runs {
                    let format = RunFormat {
                        font: &style.font_family,
                        color: &style.color,
                        size_pt: style.table.font_size_pt,
                        bold: header || run.bold,
                        italic: run.italic,
                        underline: run.underline,
                    };
                    write_run(w, &run.text, &format)?;
                }
                Ok(())
            })?;
            Ok(())
        };

        // Every cell needs at least one paragraph.
        if paragraphs.is_empty() {
            write_cell_paragraph(w, &[])?;
        }
        for paragraph in paragraphs {
            write_cell_paragraph(w, &paragraph.runs)?;
        }
        Ok(())
    })?;
    Ok(())
}

fn write_table(w: &mut XmlWriter, table: &Table, style: &TemplateStyle) -> io::Result<()> {
    let columns = table.column_count().max(1);
    let rows = table.rows.len();
    let column_width = style.page.text_width_twips() / columns as u32;
    let column_width_text = column_width.to_string();

    w.create_element("w:tbl").write_inner_content(|w| {
        w.create_element("w:tblPr").write_inner_content(|w| {
            write_val(w, "w:tblStyle", "TableGrid")?;
            w.create_element("w:tblW")
                .with_attributes([("w:w", "0"), ("w:type", "auto")])
                .write_empty()?;
            write_val(w, "w:jc", "center")?;
            write_borders(
                w,
                "w:tblBorders",
                &style.color,
                &[
                    ("w:top", style.table.outer_border_size),
                    ("w:left", style.table.outer_border_size),
                    ("w:bottom", style.table.outer_border_size),
                    ("w:right", style.table.outer_border_size),
                    ("w:insideH", style.table.inner_border_size),
                    ("w:insideV", style.table.inner_border_size),
                ],
            )
        })?;
        w.create_element("w:tblGrid").write_inner_content(|w| {
            for _ in 0..columns {
                write_val_attr(w, "w:gridCol", "w:w", &column_width_text)?;
            }
            Ok(())
        })?;
        for (row_index, row) in table.rows.iter().enumerate() {
            w.create_element("w:tr").write_inner_content(|w| {
                for column in 0..columns {
                    let position = CellPosition {
                        row: row_index,
                        column,
                        rows,
                        columns,
                    };
                    write_cell(w, row.get(column), &position, column_width, style)?;
                }
                Ok(())
            })?;
        }
        Ok(())
    })?;
    Ok(())
}

fn write_val_attr(w: &mut XmlWriter, name: &str, attr: &str, value: &str) -> io::Result<()> {
    w.create_element(name)
        .with_attribute((attr, value))
        .write_empty()?;
    Ok(())
}

fn write_section(w: &mut XmlWriter, style: &TemplateStyle) -> io::Result<()> {
    let page = &style.page;
    let width = page.width_twips().to_string();
    let height = page.height_twips().to_string();
    let margin = page.margin_twips.to_string();
    let header = page.header_distance_twips.to_string();
    let footer = page.footer_distance_twips.to_string();

    w.create_element("w:sectPr").write_inner_content(|w| {
        w.create_element("w:footerReference")
            .with_attributes([("w:type", "default"), ("r:id", FOOTER_REL_ID)])
            .write_empty()?;
        w.create_element("w:pgSz")
            .with_attributes([("w:w", width.as_str()), ("w:h", height.as_str())])
            .write_empty()?;
        w.create_element("w:pgMar")
            .with_attributes([
                ("w:top", margin.as_str()),
                ("w:right", margin.as_str()),
                ("w:bottom", margin.as_str()),
                ("w:left", margin.as_str()),
                ("w:header", header.as_str()),
                ("w:footer", footer.as_str()),
                ("w:gutter", "0"),
            ])
            .write_empty()?;
        Ok(())
    })?;
    Ok(())
}

fn document_xml(
    blocks: &[StyledBlock],
    media: &[MediaPart<'_>],
    style: &TemplateStyle,
) -> io::Result<Vec<u8>> {
    let mut media = media.iter();
    let mut w = new_part()?;
    w.create_element("w:document")
        .with_attributes([
            ("xmlns:w", NS_W),
            ("xmlns:r", NS_R),
            ("xmlns:wp", NS_WP),
            ("xmlns:a", NS_A),
            ("xmlns:pic", NS_PIC),
        ])
        .write_inner_content(|w| {
            w.create_element("w:body").write_inner_content(|w| {
                if blocks.is_empty() {
                    w.create_element("w:p").write_empty()?;
                }
                for block in blocks {
                    match block {
                        StyledBlock::Paragraph { role, runs } => {
                            write_body_paragraph(w, *role, runs, style)?
                        }
                        StyledBlock::Table(table) => write_table(w, table, style)?,
                        StyledBlock::Spacer => write_spacer(w, style)?,
                        StyledBlock::Image(_) => {
                            if let Some(part) = media.next() {
                                write_image(w, part, style)?;
                            }
                        }
                    }
                }
                write_section(w, style)
            })?;
            Ok(())
        })?;
    Ok(w.into_inner())
}
