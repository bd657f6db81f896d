pub mod model;
pub mod registry;

pub use model::{
    output_filename_for, DocumentFormat, FileFailure, InputFile, Job, JobStatus, OutputFile,
};
pub use registry::{InMemoryJobRegistry, JobRegistry};
