//! Builders for fixture documents.
//!
//! DOCX fixtures are minimal WordprocessingML packages; PDF fixtures carry a
//! real text layer so the converter has something to extract.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use lopdf::{dictionary, Object, Stream};
use zip::write::SimpleFileOptions;

enum FixtureBlock {
    Paragraph(String),
    Table(Vec<Vec<String>>),
    /// Index into the builder's media list.
    Picture(usize),
}

/// Builder for DOCX packages.
pub struct DocxBuilder {
    blocks: Vec<FixtureBlock>,
    media: Vec<Vec<u8>>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            media: Vec::new(),
        }
    }

    /// Adds an inline PNG picture in its own paragraph.
    pub fn picture(mut self, png: Vec<u8>) -> Self {
        self.blocks.push(FixtureBlock::Picture(self.media.len()));
        self.media.push(png);
        self
    }

    /// Adds a paragraph with a single plain run.
    pub fn paragraph(mut self, text: &str) -> Self {
        self.blocks.push(FixtureBlock::Paragraph(format!(
            "<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
            escape(text)
        )));
        self
    }

    /// Adds a paragraph whose first run is bold and second italic.
    pub fn styled_paragraph(mut self, bold: &str, italic: &str) -> Self {
        self.blocks.push(FixtureBlock::Paragraph(format!(
            "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">{}</w:t></w:r>\
             <w:r><w:rPr><w:i/></w:rPr><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
            escape(bold),
            escape(italic)
        )));
        self
    }

    /// Adds one paragraph whose lines are separated by manual line breaks.
    pub fn multiline_paragraph(mut self, lines: &[&str]) -> Self {
        let runs: Vec<String> = lines
            .iter()
            .map(|line| {
                let cells: Vec<String> = line
                    .split('\t')
                    .map(|part| format!("<w:t xml:space=\"preserve\">{}</w:t>", escape(part)))
                    .collect();
                cells.join("<w:tab/>")
            })
            .collect();
        self.blocks.push(FixtureBlock::Paragraph(format!(
            "<w:p><w:r>{}</w:r></w:p>",
            runs.join("<w:br/>")
        )));
        self
    }

    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        self.blocks.push(FixtureBlock::Table(
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        ));
        self
    }

    fn document_xml(&self) -> String {
        let mut body = String::new();
        for block in &self.blocks {
            match block {
                FixtureBlock::Paragraph(xml) => body.push_str(xml),
                FixtureBlock::Table(rows) => {
                    body.push_str("<w:tbl>");
                    for row in rows {
                        body.push_str("<w:tr>");
                        for cell in row {
                            body.push_str(&format!(
                                "<w:tc><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:tc>",
                                escape(cell)
                            ));
                        }
                        body.push_str("</w:tr>");
                    }
                    body.push_str("</w:tbl>");
                }
                FixtureBlock::Picture(index) => body.push_str(&format!(
                    "<w:p><w:r><w:drawing><wp:inline><wp:extent cx=\"952500\" cy=\"952500\"/>\
                     <a:graphic><a:graphicData><pic:pic><pic:blipFill>\
                     <a:blip r:embed=\"rIdPic{}\"/>\
                     </pic:blipFill></pic:pic></a:graphicData></a:graphic>\
                     </wp:inline></w:drawing></w:r></w:p>",
                    index
                )),
            }
        }
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" \
             xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
             xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\" \
             xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
             xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
             <w:body>{}<w:sectPr/></w:body></w:document>",
            body
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(
            b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
              <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
              <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
              <Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
              </Types>",
        )
        .unwrap();

        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(self.document_xml().as_bytes()).unwrap();

        if !self.media.is_empty() {
            let mut rels = String::from(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                 <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
            );
            for (index, data) in self.media.iter().enumerate() {
                rels.push_str(&format!(
                    "<Relationship Id=\"rIdPic{0}\" \
                     Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/image\" \
                     Target=\"media/picture{0}.png\"/>",
                    index
                ));
                zip.start_file(format!("word/media/picture{}.png", index), options)
                    .unwrap();
                zip.write_all(data).unwrap();
            }
            rels.push_str("</Relationships>");
            zip.start_file("word/_rels/document.xml.rels", options).unwrap();
            zip.write_all(rels.as_bytes()).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }
}

/// A solid-colour PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 120, 60]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Builder for PDFs with one text object per line.
pub struct PdfBuilder {
    pages: Vec<Vec<String>>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self { pages: Vec::new() }
    }

    pub fn page(mut self, lines: &[&str]) -> Self {
        self.pages
            .push(lines.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for lines in &self.pages {
            let mut content = String::new();
            let mut y = 780;
            for line in lines {
                let escaped = line
                    .replace('\\', "\\\\")
                    .replace('(', "\\(")
                    .replace(')', "\\)");
                content.push_str(&format!("BT /F1 11 Tf 50 {} Td ({}) Tj ET\n", y, escaped));
                y -= 14;
            }
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            });
            kids.push(Object::from(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}
