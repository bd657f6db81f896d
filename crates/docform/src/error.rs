use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocformError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File is empty")]
    EmptyFile,

    #[error("Failed to convert PDF to DOCX: {0}")]
    Conversion(String),

    #[error("Failed to open source DOCX: {0}")]
    DocxProcessing(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Failed to apply template: {0}")]
    Formatting(String),

    #[error("Failed to save output document: {0}")]
    Output(#[from] StorageError),
}

impl ProcessError {
    /// True for failures of the PDF to DOCX conversion step.
    pub fn is_conversion(&self) -> bool {
        matches!(self, ProcessError::Conversion(_))
    }

    /// True for failures of the template step.
    pub fn is_formatting(&self) -> bool {
        matches!(self, ProcessError::Formatting(_))
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove directory '{path}': {source}")]
    RemoveDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("Failed to build archive: {0}")]
    Archive(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job already exists: {0}")]
    AlreadyExists(String),
}

pub type Result<T> = std::result::Result<T, DocformError>;
