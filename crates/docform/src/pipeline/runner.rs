use std::path::Path;

use tracing::{info_span, warn};

use crate::document::Document;
use crate::error::{ProcessError, RegistryError};
use crate::job::{InputFile, Job, JobRegistry, OutputFile};
use crate::processor::ReaderRegistry;
use crate::sanitize;
use crate::storage::JobStorage;
use crate::template::{Formatter, PackageInfo};

/// Turns uploaded originals into formatted documents.
pub struct Pipeline {
    readers: ReaderRegistry,
    formatter: Formatter,
    storage: JobStorage,
}

impl Pipeline {
    pub fn new(storage: JobStorage) -> Self {
        Self {
            readers: ReaderRegistry::new(),
            formatter: Formatter::new(),
            storage,
        }
    }

    pub fn storage(&self) -> &JobStorage {
        &self.storage
    }

    /// Loads, formats and stores one input. Nothing is written unless every
    /// step succeeds.
    pub fn process_file(&self, job_id: &str, input: &InputFile) -> Result<OutputFile, ProcessError> {
        let filename = sanitize::redact_path(&input.path);
        let _pipeline_span = info_span!("pipeline",
            job_id = %job_id,
            filename = %filename,
            format = input.format.extension(),
        )
        .entered();

        // Step 1: Load (PDF inputs are converted here)
        let document = {
            let _step = info_span!("load_document").entered();
            self.step_load(input)?
        };

        // Step 2: Apply the template
        let package = {
            let _step = info_span!("apply_template").entered();
            self.step_format(input, &document)?
        };

        // Step 3: Store atomically
        let output = {
            let _step = info_span!("write_output").entered();
            self.step_write(job_id, input, &package)?
        };

        log::info!(
            "Processed {} -> {} for job {}",
            input.filename,
            output.filename,
            job_id
        );
        Ok(output)
    }

    fn step_load(&self, input: &InputFile) -> Result<Document, ProcessError> {
        let document = self.readers.read(input)?;
        if document.is_empty() {
            log::debug!("{} has no visible text", input.filename);
        }
        Ok(document)
    }

    fn step_format(&self, input: &InputFile, document: &Document) -> Result<Vec<u8>, ProcessError> {
        let title = Path::new(&input.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        self.formatter.render(document, &PackageInfo::new(title))
    }

    fn step_write(
        &self,
        job_id: &str,
        input: &InputFile,
        package: &[u8],
    ) -> Result<OutputFile, ProcessError> {
        let path = self
            .storage
            .write_output(job_id, &input.output_filename(), package)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| input.output_filename());
        Ok(OutputFile { filename, path })
    }

    /// Processes every input of a job in order, recording each outcome in
    /// the registry, and settles the final status. Returns the final job,
    /// or `None` when the job was deleted while it ran.
    pub fn run_job(
        &self,
        job_id: &str,
        inputs: &[InputFile],
        registry: &dyn JobRegistry,
    ) -> Option<Job> {
        let _job_span = info_span!("job", job_id = %job_id, files = inputs.len()).entered();

        if self.apply(job_id, registry, |job| job.mark_processing()).is_none() {
            self.discard(job_id);
            return None;
        }

        for input in inputs {
            if registry.get(job_id).is_none() {
                self.discard(job_id);
                return None;
            }

            let recorded = match self.process_file(job_id, input) {
                Ok(output) => self.apply(job_id, registry, |job| {
                    job.record_output(output.filename.clone())
                }),
                Err(e) => {
                    let stage = if e.is_conversion() {
                        "conversion"
                    } else if e.is_formatting() {
                        "formatting"
                    } else {
                        "processing"
                    };
                    warn!(
                        "Failed {} of {} in job {}: {}",
                        stage, input.filename, job_id, e
                    );
                    let message = e.to_string();
                    self.apply(job_id, registry, |job| {
                        job.record_failure(input.filename.clone(), message.clone())
                    })
                }
            };
            if recorded.is_none() {
                self.discard(job_id);
                return None;
            }
        }

        let job = self.apply(job_id, registry, |job| job.finish())?;
        if !job.is_fully_accounted() {
            log::warn!(
                "Job {} lists {} inputs but only {} were processed",
                job_id,
                job.input_files.len(),
                job.output_files.len() + job.error_files.len()
            );
        }
        log::info!(
            "Job {} finished as {} ({} outputs, {} failures)",
            job_id,
            job.status,
            job.output_files.len(),
            job.error_files.len()
        );
        Some(job)
    }

    /// Updates the job; a job deleted in the meantime yields `None`.
    fn apply<F>(&self, job_id: &str, registry: &dyn JobRegistry, mut change: F) -> Option<Job>
    where
        F: FnMut(&mut Job),
    {
        match registry.update(job_id, &mut change) {
            Ok(job) => Some(job),
            Err(RegistryError::JobNotFound(_)) => {
                log::info!("Job {} was deleted during processing", job_id);
                None
            }
            Err(e) => {
                log::warn!("Could not update job {}: {}", job_id, e);
                None
            }
        }
    }

    /// Drops anything written for a job that no longer exists.
    fn discard(&self, job_id: &str) {
        if let Err(e) = self.storage.remove_job(job_id) {
            log::warn!("Failed to remove files of deleted job {}: {}", job_id, e);
        }
    }
}
