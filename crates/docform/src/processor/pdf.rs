use std::collections::HashSet;
use std::path::Path;

use lopdf::xobject::PdfImage;

use crate::document::{Block, Document, Image, Paragraph};
use crate::error::ProcessError;
use crate::job::DocumentFormat;
use crate::processor::image::{image_from_samples, load_image};
use crate::processor::DocumentReader;

/// Converts a PDF into the document model from its embedded text layer.
pub struct PdfConverter;

impl PdfConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentReader for PdfConverter {
    fn read(&self, path: &Path) -> Result<Document, ProcessError> {
        let _span = tracing::info_span!("reader.pdf").entered();

        let pdf_bytes = std::fs::read(path).map_err(|e| ProcessError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })?;
        convert_pdf_bytes(&pdf_bytes)
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Pdf)
    }
}

/// Marker lopdf emits for glyphs in CID fonts it cannot decode.
const IDENTITY_H_PATTERN: &str = "?Identity-H Unimplemented?";

pub fn convert_pdf_bytes(pdf_bytes: &[u8]) -> Result<Document, ProcessError> {
    let doc = lopdf::Document::load_mem(pdf_bytes)
        .map_err(|e| ProcessError::Conversion(format!("Failed to load PDF: {}", e)))?;

    if doc.is_encrypted() {
        return Err(ProcessError::Conversion("PDF is encrypted".to_string()));
    }

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(ProcessError::Conversion("PDF has no pages".to_string()));
    }

    let mut blocks = Vec::new();
    let mut seen_images = HashSet::new();
    let mut paragraph_count = 0;

    for (page_num, page_id) in pages {
        match doc.extract_text(&[page_num]) {
            Ok(page_text) => {
                let page_text = page_text.replace(IDENTITY_H_PATTERN, "");
                let lines: Vec<&str> = page_text.lines().collect();
                // Page boundaries end the current paragraph.
                for text in reflow_lines(&lines) {
                    paragraph_count += 1;
                    blocks.push(Block::Paragraph(Paragraph::from_text(text)));
                }
            }
            Err(e) => {
                log::warn!("Skipping PDF page {}: {}", page_num, e);
            }
        }

        // Pages without resources have no images either.
        let Ok(page_images) = doc.get_page_images(page_id) else {
            continue;
        };
        for pdf_image in page_images {
            if !seen_images.insert(pdf_image.id) {
                continue;
            }
            match page_image(&doc, &pdf_image) {
                Ok(image) => blocks.push(Block::Image(image)),
                Err(e) => log::warn!(
                    "Skipping image {:?} on PDF page {}: {}",
                    pdf_image.id,
                    page_num,
                    e
                ),
            }
        }
    }

    if paragraph_count == 0 {
        return Err(ProcessError::Conversion(
            "No extractable text found in PDF".to_string(),
        ));
    }

    log::debug!(
        "Converted PDF into {} paragraphs and {} images",
        paragraph_count,
        blocks.len() - paragraph_count
    );

    Ok(Document { blocks })
}

/// Decodes an image XObject. JPEG streams are embedded as they are; other
/// streams must decode to 8-bit RGB or gray samples.
fn page_image(doc: &lopdf::Document, pdf_image: &PdfImage<'_>) -> Result<Image, ProcessError> {
    let filters = pdf_image.filters.as_deref().unwrap_or_default();
    if filters == ["DCTDecode"] {
        return load_image(pdf_image.content.to_vec());
    }

    let samples = if filters.is_empty() {
        pdf_image.content.to_vec()
    } else {
        doc.get_object(pdf_image.id)
            .and_then(|object| object.as_stream())
            .and_then(|stream| stream.decompressed_content())
            .map_err(|e| ProcessError::ImageProcessing(format!("Failed to decode stream: {}", e)))?
    };

    if pdf_image.bits_per_component != Some(8) {
        return Err(ProcessError::ImageProcessing(format!(
            "Unsupported bits per component: {:?}",
            pdf_image.bits_per_component
        )));
    }
    let (width, height) = match (u32::try_from(pdf_image.width), u32::try_from(pdf_image.height)) {
        (Ok(width), Ok(height)) if width > 0 && height > 0 => (width, height),
        _ => {
            return Err(ProcessError::ImageProcessing(format!(
                "Invalid image size {}x{}",
                pdf_image.width, pdf_image.height
            )))
        }
    };
    let color_space = pdf_image.color_space.as_deref().unwrap_or("DeviceGray");

    image_from_samples(width, height, color_space, samples)
}

/// Groups extracted lines into paragraphs.
///
/// Blank lines always end a paragraph. A line that starts with a lowercase
/// letter continues the previous one unless that line ended a sentence.
pub fn reflow_lines<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            if let Some(paragraph) = current.take() {
                paragraphs.push(paragraph);
            }
            continue;
        }

        match current.as_mut() {
            Some(paragraph) if continues_previous(paragraph, line) => {
                paragraph.push(' ');
                paragraph.push_str(line);
            }
            _ => {
                if let Some(paragraph) = current.replace(line.to_string()) {
                    paragraphs.push(paragraph);
                }
            }
        }
    }

    if let Some(paragraph) = current {
        paragraphs.push(paragraph);
    }

    paragraphs
}

fn continues_previous(previous: &str, line: &str) -> bool {
    let ends_sentence = previous.ends_with(['.', '!', '?', ':', ';']);
    let starts_lowercase = line.chars().next().is_some_and(char::is_lowercase);
    !ends_sentence && starts_lowercase
}
