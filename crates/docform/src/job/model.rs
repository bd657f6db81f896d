use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a formatting job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Returns true for `Completed` and `Failed`; neither is ever left again.
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Source formats accepted for upload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Docx,
    Pdf,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "docx" => Some(DocumentFormat::Docx),
            "pdf" => Some(DocumentFormat::Pdf),
            _ => None,
        }
    }

    pub fn from_filename(filename: &str) -> Option<Self> {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Docx => "docx",
            DocumentFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(&self) -> String {
        mime_guess::from_ext(self.extension())
            .first_or_octet_stream()
            .to_string()
    }
}

/// An uploaded original, stored under the job's input directory.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub filename: String,
    pub format: DocumentFormat,
    pub path: PathBuf,
}

impl InputFile {
    /// Returns `None` when the filename does not carry a supported extension.
    pub fn new(filename: impl Into<String>, path: PathBuf) -> Option<Self> {
        let filename = filename.into();
        let format = DocumentFormat::from_filename(&filename)?;
        Some(Self {
            filename,
            format,
            path,
        })
    }

    /// Name of the formatted document produced from this input.
    pub fn output_filename(&self) -> String {
        output_filename_for(&self.filename)
    }
}

/// `report.pdf` -> `processed_report.docx`.
pub fn output_filename_for(input_filename: &str) -> String {
    let stem = Path::new(input_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    format!("processed_{}.docx", stem)
}

/// A formatted document written to the job's output directory.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub filename: String,
    pub path: PathBuf,
}

/// A per-file failure surfaced in job status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileFailure {
    pub filename: String,
    pub error: String,
}

/// Status record for one upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub input_files: Vec<String>,
    pub output_files: Vec<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub error_files: Vec<FileFailure>,
}

impl Job {
    pub fn new(job_id: impl Into<String>, input_files: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            input_files,
            output_files: Vec::new(),
            error: None,
            error_files: Vec::new(),
        }
    }

    /// Creates a job with a fresh random identifier.
    pub fn with_new_id(input_files: Vec<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), input_files)
    }

    pub fn mark_processing(&mut self) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Processing;
            self.touch();
        }
    }

    pub fn record_output(&mut self, filename: impl Into<String>) {
        if self.status.is_finished() {
            return;
        }
        self.output_files.push(filename.into());
        self.touch();
    }

    pub fn record_failure(&mut self, filename: impl Into<String>, error: impl Into<String>) {
        if self.status.is_finished() {
            return;
        }
        self.error_files.push(FileFailure {
            filename: filename.into(),
            error: error.into(),
        });
        self.touch();
    }

    /// Settles the terminal status: completed when anything was produced,
    /// failed otherwise.
    pub fn finish(&mut self) {
        if self.status.is_finished() {
            return;
        }
        if self.output_files.is_empty() {
            self.status = JobStatus::Failed;
            self.error = Some("No files were processed successfully".to_string());
        } else {
            self.status = JobStatus::Completed;
        }
        let now = Utc::now();
        self.updated_at = now;
        self.completed_at = Some(now);
    }

    /// Fails the whole job with a job-level message.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status.is_finished() {
            return;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        let now = Utc::now();
        self.updated_at = now;
        self.completed_at = Some(now);
    }

    /// Every input has either an output or a recorded failure.
    pub fn is_fully_accounted(&self) -> bool {
        self.output_files.len() + self.error_files.len() >= self.input_files.len()
    }

    pub fn has_output(&self, filename: &str) -> bool {
        self.output_files.iter().any(|f| f == filename)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
