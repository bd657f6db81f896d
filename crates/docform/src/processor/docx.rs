use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::document::{Block, Cell, Document, Image, Paragraph, Run, Table};
use crate::error::ProcessError;
use crate::job::DocumentFormat;
use crate::processor::image::load_image;
use crate::processor::DocumentReader;

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// Reads the main story of a WordprocessingML package.
pub struct DocxReader;

impl DocxReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxReader {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentReader for DocxReader {
    fn read(&self, path: &Path) -> Result<Document, ProcessError> {
        let _span = tracing::info_span!("reader.docx").entered();

        let file = std::fs::File::open(path).map_err(|e| ProcessError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })?;
        read_docx(file)
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Docx)
    }
}

/// Parses an in-memory DOCX package.
pub fn read_docx_bytes(bytes: &[u8]) -> Result<Document, ProcessError> {
    read_docx(Cursor::new(bytes))
}

fn read_docx<R: Read + Seek>(reader: R) -> Result<Document, ProcessError> {
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| ProcessError::DocxProcessing(format!("Failed to open DOCX: {}", e)))?;

    let xml_content = {
        let mut document_xml = archive.by_name(DOCUMENT_PART).map_err(|e| {
            ProcessError::DocxProcessing(format!("Failed to find document.xml: {}", e))
        })?;
        let mut content = String::new();
        document_xml.read_to_string(&mut content).map_err(|e| {
            ProcessError::DocxProcessing(format!("Failed to read document.xml: {}", e))
        })?;
        content
    };

    // A package without relationships simply has no pictures.
    let image_targets = match read_text_part(&mut archive, DOCUMENT_RELS_PART) {
        Some(rels) => image_relationships(&rels),
        None => HashMap::new(),
    };

    parse_with_images(&xml_content, |rel_id| {
        let part = package_part(image_targets.get(rel_id)?);
        let mut data = Vec::new();
        match archive.by_name(&part) {
            Ok(mut file) => {
                if let Err(e) = file.read_to_end(&mut data) {
                    log::warn!("Skipping image {}: {}", part, e);
                    return None;
                }
            }
            Err(e) => {
                log::warn!("Skipping image {}: {}", part, e);
                return None;
            }
        }
        match load_image(data) {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("Skipping image {}: {}", part, e);
                None
            }
        }
    })
}

fn read_text_part<R: Read + Seek>(archive: &mut zip::ZipArchive<R>, name: &str) -> Option<String> {
    let mut file = archive.by_name(name).ok()?;
    let mut content = String::new();
    file.read_to_string(&mut content).ok()?;
    Some(content)
}

/// Maps relationship ids of internal image targets to their target paths.
pub fn image_relationships(rels_xml: &str) -> HashMap<String, String> {
    let mut reader = Reader::from_str(rels_xml);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                let mut is_image = false;
                let mut external = false;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).into_owned();
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = Some(value),
                        b"Target" => target = Some(value),
                        b"Type" => is_image = value.ends_with("/image"),
                        b"TargetMode" => external = value == "External",
                        _ => {}
                    }
                }
                if let (Some(id), Some(target), true, false) = (id, target, is_image, external) {
                    targets.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("Unreadable document relationships: {}", e);
                break;
            }
            _ => {}
        }
    }

    targets
}

/// Resolves a relationship target of the main document part to a zip entry.
fn package_part(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments = vec!["word"];
    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "" | "." => {}
            name => segments.push(name),
        }
    }
    segments.join("/")
}

/// Relationship id of a picture reference (`a:blip r:embed`, `v:imagedata r:id`).
fn image_reference(e: &BytesStart<'_>) -> Option<String> {
    let key: &[u8] = match e.local_name().as_ref() {
        b"blip" => b"embed",
        b"imagedata" => b"id",
        _ => return None,
    };
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

/// Elements whose content is not part of the main text flow (drawings,
/// text boxes, alternate content). Everything inside them is skipped.
fn is_skipped_container(local_name: &[u8]) -> bool {
    matches!(
        local_name,
        b"drawing" | b"pict" | b"AlternateContent" | b"object" | b"txbxContent" | b"instrText"
    )
}

/// `<w:b/>` is on, `<w:b w:val="0"/>` / `false` / `none` is off.
fn toggle_value(e: &BytesStart<'_>) -> bool {
    match e.try_get_attribute("w:val") {
        Ok(Some(attr)) => !matches!(attr.value.as_ref(), b"0" | b"false" | b"none" | b"off"),
        _ => true,
    }
}

#[derive(Default)]
struct TableBuilder {
    rows: Vec<Vec<Cell>>,
    row: Option<Vec<Cell>>,
    cell: Option<Cell>,
}

/// Body content in document order, with pictures still unresolved.
enum ParsedBlock {
    Content(Block),
    ImageRef(String),
}

#[derive(Default)]
struct BodyParser {
    blocks: Vec<ParsedBlock>,
    pending_images: Vec<String>,
    tables: Vec<TableBuilder>,
    paragraph: Option<Paragraph>,
    run: Option<Run>,
    in_run_properties: bool,
    in_text: bool,
    skip_depth: usize,
}

impl BodyParser {
    fn start(&mut self, e: &BytesStart<'_>, is_empty: bool) {
        let local_name = e.local_name();
        let name = local_name.as_ref();

        if let Some(rel_id) = image_reference(e) {
            self.pending_images.push(rel_id);
        }

        if self.skip_depth > 0 {
            if !is_empty {
                self.skip_depth += 1;
            }
            return;
        }
        if is_skipped_container(name) {
            if !is_empty {
                self.skip_depth = 1;
            }
            return;
        }

        match name {
            b"tbl" => self.tables.push(TableBuilder::default()),
            b"tr" => {
                if let Some(table) = self.tables.last_mut() {
                    table.row = Some(Vec::new());
                }
            }
            b"tc" => {
                if let Some(table) = self.tables.last_mut() {
                    table.cell = Some(Cell::default());
                }
            }
            b"p" => {
                self.paragraph = Some(Paragraph::default());
                if is_empty {
                    self.end_paragraph();
                }
            }
            b"r" if self.paragraph.is_some() => {
                self.run = Some(Run::default());
            }
            b"rPr" if self.run.is_some() => {
                self.in_run_properties = !is_empty;
            }
            b"b" | b"i" | b"u" if self.in_run_properties => {
                let on = toggle_value(e);
                if let Some(run) = self.run.as_mut() {
                    match name {
                        b"b" => run.bold = on,
                        b"i" => run.italic = on,
                        _ => run.underline = on,
                    }
                }
            }
            b"t" if self.run.is_some() => self.in_text = !is_empty,
            b"tab" if self.run.is_some() && !self.in_run_properties => self.push_text("\t"),
            b"br" | b"cr" if self.run.is_some() && !self.in_run_properties => {
                self.push_text("\n")
            }
            _ => {}
        }
    }

    fn end(&mut self, local_name: &[u8]) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }

        match local_name {
            b"t" => self.in_text = false,
            b"rPr" => self.in_run_properties = false,
            b"r" => {
                if let Some(run) = self.run.take() {
                    if let Some(paragraph) = self.paragraph.as_mut() {
                        if !run.text.is_empty() {
                            paragraph.runs.push(run);
                        }
                    }
                }
                self.in_run_properties = false;
                self.in_text = false;
            }
            b"p" => self.end_paragraph(),
            b"tc" => {
                if let Some(table) = self.tables.last_mut() {
                    if let (Some(cell), Some(row)) = (table.cell.take(), table.row.as_mut()) {
                        row.push(cell);
                    }
                }
            }
            b"tr" => {
                if let Some(table) = self.tables.last_mut() {
                    if let Some(row) = table.row.take() {
                        table.rows.push(row);
                    }
                }
            }
            b"tbl" => {
                if let Some(finished) = self.tables.pop() {
                    let table = Table {
                        rows: finished.rows,
                    };
                    self.finish_table(table);
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(run) = self.run.as_mut() {
            run.text.push_str(text);
        }
    }

    fn text(&mut self, text: &str) {
        if self.skip_depth == 0 && self.in_text {
            self.push_text(text);
        }
    }

    fn end_paragraph(&mut self) {
        let Some(paragraph) = self.paragraph.take() else {
            return;
        };
        match self.tables.last_mut().and_then(|t| t.cell.as_mut()) {
            Some(cell) => {
                cell.paragraphs.push(paragraph);
                if !self.pending_images.is_empty() {
                    log::debug!("Dropping {} pictures inside a table cell", self.pending_images.len());
                    self.pending_images.clear();
                }
            }
            None => {
                self.blocks.push(ParsedBlock::Content(Block::Paragraph(paragraph)));
                // Pictures follow the paragraph that anchors them.
                self.blocks
                    .extend(self.pending_images.drain(..).map(ParsedBlock::ImageRef));
            }
        }
    }

    /// Nested tables are flattened into the enclosing cell, one paragraph
    /// per inner row.
    fn finish_table(&mut self, table: Table) {
        match self.tables.last_mut().and_then(|t| t.cell.as_mut()) {
            Some(cell) => {
                for row in &table.rows {
                    let text = row.iter().map(Cell::text).collect::<Vec<_>>().join("\t");
                    cell.paragraphs.push(Paragraph::from_text(text));
                }
            }
            None => self.blocks.push(ParsedBlock::Content(Block::Table(table))),
        }
    }
}

/// Parses `word/document.xml` into the document model. Picture
/// references are dropped since there is no package to resolve them in.
pub fn parse_document_xml(xml: &str) -> Result<Document, ProcessError> {
    parse_with_images(xml, |_| None)
}

/// Parses `word/document.xml`, turning each picture reference into an image
/// block via `resolve`. References it cannot resolve are skipped.
pub fn parse_with_images<F>(xml: &str, mut resolve: F) -> Result<Document, ProcessError>
where
    F: FnMut(&str) -> Option<Image>,
{
    let blocks = parse_body(xml)?
        .into_iter()
        .filter_map(|block| match block {
            ParsedBlock::Content(block) => Some(block),
            ParsedBlock::ImageRef(rel_id) => resolve(&rel_id).map(Block::Image),
        })
        .collect();
    Ok(Document { blocks })
}

fn parse_body(xml: &str) -> Result<Vec<ParsedBlock>, ProcessError> {
    let mut reader = Reader::from_str(xml);
    let mut parser = BodyParser::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => parser.start(e, false),
            Ok(Event::Empty(ref e)) => parser.start(e, true),
            Ok(Event::End(ref e)) => parser.end(e.local_name().as_ref()),
            Ok(Event::Text(e)) => {
                let decoded = e.decode().map_err(|err| {
                    ProcessError::DocxProcessing(format!("XML decoding error: {}", err))
                })?;
                parser.text(&decoded);
            }
            Ok(Event::CData(e)) => {
                let decoded = e.decode().map_err(|err| {
                    ProcessError::DocxProcessing(format!("XML decoding error: {}", err))
                })?;
                parser.text(&decoded);
            }
            Ok(Event::GeneralRef(e)) => {
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    parser.text(ch.encode_utf8(&mut [0u8; 4]));
                } else if let Ok(name) = e.decode() {
                    if let Some(resolved) = quick_xml::escape::resolve_predefined_entity(&name) {
                        parser.text(resolved);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ProcessError::DocxProcessing(format!(
                    "XML parsing error: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    // Pictures anchored outside any finished paragraph.
    let mut blocks = parser.blocks;
    blocks.extend(parser.pending_images.into_iter().map(ParsedBlock::ImageRef));
    Ok(blocks)
}
