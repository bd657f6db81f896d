//! Test harness for isolated pipeline runs.
//!
//! Each `TestHarness` owns a temporary workspace with its own upload and
//! output roots, a registry and a pipeline wired to them.

#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::path::PathBuf;

use tempfile::TempDir;

use docform::job::{InMemoryJobRegistry, InputFile, Job, JobRegistry};
use docform::storage::JobStorage;
use docform::Pipeline;

pub struct TestHarness {
    temp_dir: TempDir,
    pub upload_root: PathBuf,
    pub output_root: PathBuf,
    pub registry: InMemoryJobRegistry,
    pub pipeline: Pipeline,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let upload_root = temp_dir.path().join("uploads");
        let output_root = temp_dir.path().join("outputs");

        let storage = JobStorage::new(&upload_root, &output_root);
        storage.ensure_roots().expect("Failed to create storage roots");

        Self {
            temp_dir,
            upload_root,
            output_root,
            registry: InMemoryJobRegistry::new(),
            pipeline: Pipeline::new(storage),
        }
    }

    pub fn storage(&self) -> &JobStorage {
        self.pipeline.storage()
    }

    /// Stores the given files as a new job and registers it as pending.
    pub fn submit(&self, files: &[(&str, Vec<u8>)]) -> (String, Vec<InputFile>) {
        let job = Job::with_new_id(Vec::new());
        let job_id = job.job_id.clone();
        self.storage().create_job_dirs(&job_id).unwrap();

        let mut inputs = Vec::new();
        for (name, content) in files {
            let path = self.storage().save_input(&job_id, name, content).unwrap();
            inputs.push(InputFile::new(*name, path).expect("supported extension"));
        }

        let names = inputs.iter().map(|i| i.filename.clone()).collect();
        self.registry.create(Job::new(job_id.clone(), names)).unwrap();
        (job_id, inputs)
    }

    /// Submits and processes a job, returning its final state.
    pub fn run(&self, files: &[(&str, Vec<u8>)]) -> Job {
        let (job_id, inputs) = self.submit(files);
        self.pipeline
            .run_job(&job_id, &inputs, &self.registry)
            .expect("job should still exist")
    }

    /// Reads a part (e.g. `word/document.xml`) out of a produced output.
    pub fn output_part(&self, job: &Job, filename: &str, part: &str) -> String {
        let bytes = self.storage().read_output(&job.job_id, filename).unwrap();
        read_part(&bytes, part)
    }
}

pub fn read_part(package: &[u8], part: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(package)).unwrap();
    let mut content = String::new();
    archive
        .by_name(part)
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    content
}
