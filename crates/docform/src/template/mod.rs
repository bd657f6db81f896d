pub mod classify;
pub mod styles;
pub mod writer;

use crate::document::{Block, Cell, Document, Image, Run, Table};
use crate::error::ProcessError;

pub use styles::{ParagraphRole, TemplateStyle};
pub use writer::PackageInfo;

/// Paragraphs after a heading that may still be deeper-numbered subheadings.
const SUBHEADING_WINDOW: usize = 3;

/// A block of the output document with its styling decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyledBlock {
    Paragraph { role: ParagraphRole, runs: Vec<Run> },
    Table(Table),
    Image(Image),
    /// Empty paragraph placed around tables.
    Spacer,
}

/// Applies the fixed template to documents.
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    style: TemplateStyle,
}

impl Formatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn style(&self) -> &TemplateStyle {
        &self.style
    }

    /// Decides the role of every paragraph and lays tables out with spacers.
    /// Blank paragraphs are dropped.
    pub fn layout(&self, document: &Document) -> Vec<StyledBlock> {
        let mut blocks = Vec::with_capacity(document.blocks.len());
        let mut since_heading = 0usize;

        for block in &document.blocks {
            match block {
                Block::Paragraph(paragraph) => {
                    if paragraph.is_blank() {
                        continue;
                    }
                    let text = paragraph.text();

                    if text.trim().contains('\n') {
                        if let Some(rows) = classify::detect_text_table(&text) {
                            push_table(&mut blocks, text_table(rows));
                            continue;
                        }
                    }

                    let role = if classify::is_heading(&text) {
                        since_heading = SUBHEADING_WINDOW;
                        ParagraphRole::Heading
                    } else {
                        let after_heading = since_heading > 0;
                        since_heading = since_heading.saturating_sub(1);
                        if classify::is_subheading(&text, after_heading) {
                            ParagraphRole::Subheading
                        } else {
                            ParagraphRole::Body
                        }
                    };

                    blocks.push(StyledBlock::Paragraph {
                        role,
                        runs: paragraph.runs.clone(),
                    });
                }
                Block::Table(table) => push_table(&mut blocks, table.clone()),
                Block::Image(image) => blocks.push(StyledBlock::Image(image.clone())),
            }
        }

        blocks
    }

    /// Lays the document out and serialises it as a `.docx` package.
    pub fn render(&self, document: &Document, info: &PackageInfo) -> Result<Vec<u8>, ProcessError> {
        let _span = tracing::info_span!("template.render").entered();

        let blocks = self.layout(document);
        log::debug!(
            "Laid out {} blocks ({} source blocks)",
            blocks.len(),
            document.blocks.len()
        );
        writer::write_package(&blocks, &self.style, info)
    }
}

fn push_table(blocks: &mut Vec<StyledBlock>, table: Table) {
    if table.rows.is_empty() {
        return;
    }
    blocks.push(StyledBlock::Spacer);
    blocks.push(StyledBlock::Table(table));
    blocks.push(StyledBlock::Spacer);
}

fn text_table(rows: Vec<Vec<String>>) -> Table {
    Table {
        rows: rows
            .into_iter()
            .map(|row| row.into_iter().map(Cell::from_text).collect())
            .collect(),
    }
}
