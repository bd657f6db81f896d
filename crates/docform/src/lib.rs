pub mod config;
pub mod document;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod processor;
pub mod sanitize;
pub mod storage;
pub mod template;

pub use config::{load_config, Config, LogFormat};
pub use document::Document;
pub use error::{
    ConfigError, DocformError, ProcessError, RegistryError, Result, StorageError,
};
pub use job::{
    DocumentFormat, FileFailure, InMemoryJobRegistry, InputFile, Job, JobRegistry, JobStatus,
    OutputFile,
};
pub use pipeline::Pipeline;
pub use storage::JobStorage;
pub use template::Formatter;
