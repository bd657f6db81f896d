use std::io::{Cursor, Write};
use std::path::PathBuf;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::StorageError;

/// Builds an in-memory zip whose entries are named exactly as given.
pub fn build_zip(entries: &[(String, PathBuf)]) -> Result<Vec<u8>, StorageError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, path) in entries {
        let content = std::fs::read(path).map_err(|e| StorageError::ReadFile {
            path: path.clone(),
            source: e,
        })?;
        zip.start_file(name.as_str(), options)
            .map_err(|e| StorageError::Archive(e.to_string()))?;
        zip.write_all(&content)
            .map_err(|e| StorageError::Archive(e.to_string()))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| StorageError::Archive(e.to_string()))?;
    Ok(cursor.into_inner())
}
