pub mod docx;
pub mod image;
pub mod pdf;

use std::path::Path;

use crate::document::Document;
use crate::error::ProcessError;
use crate::job::{DocumentFormat, InputFile};

/// Loads a source file into the intermediate document model.
pub trait DocumentReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Document, ProcessError>;
    fn supports(&self, format: DocumentFormat) -> bool;
}

pub struct ReaderRegistry {
    readers: Vec<Box<dyn DocumentReader>>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self {
            readers: vec![
                Box::new(docx::DocxReader::new()),
                Box::new(pdf::PdfConverter::new()),
            ],
        }
    }

    /// Validates the stored input and dispatches to the reader for its format.
    pub fn read(&self, input: &InputFile) -> Result<Document, ProcessError> {
        validate_input(&input.path)?;

        for reader in &self.readers {
            if reader.supports(input.format) {
                return reader.read(&input.path);
            }
        }

        Err(ProcessError::UnsupportedFormat(
            input.format.extension().to_string(),
        ))
    }

    /// Dispatches by the path's extension.
    pub fn read_path(&self, path: &Path) -> Result<Document, ProcessError> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let format = DocumentFormat::from_extension(extension)
            .ok_or_else(|| ProcessError::UnsupportedFormat(extension.to_string()))?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();

        self.read(&InputFile {
            filename,
            format,
            path: path.to_path_buf(),
        })
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_input(path: &Path) -> Result<(), ProcessError> {
    let metadata = std::fs::metadata(path).map_err(|e| ProcessError::ReadDocument {
        path: path.to_path_buf(),
        source: e,
    })?;

    if !metadata.is_file() {
        return Err(ProcessError::ReadDocument {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }

    if metadata.len() == 0 {
        return Err(ProcessError::EmptyFile);
    }

    Ok(())
}
