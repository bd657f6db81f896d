use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use walkdir::WalkDir;

use crate::error::StorageError;
use crate::sanitize;

/// Upper bound on `_N` suffixes tried when a name is taken.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Splits `name.ext` into (`name`, Some(`.ext`)).
fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(dot_pos) if dot_pos > 0 => (&filename[..dot_pos], Some(&filename[dot_pos..])),
        _ => (filename, None),
    }
}

/// `name.ext`, `name_2.ext`, `name_3.ext`, ...
fn numbered_name(filename: &str, counter: usize) -> String {
    if counter == 1 {
        return filename.to_string();
    }
    match split_extension(filename) {
        (base, Some(ext)) => format!("{}_{}{}", base, counter, ext),
        (base, None) => format!("{}_{}", base, counter),
    }
}

/// On-disk layout for jobs: `{upload_root}/{job_id}/` holds originals,
/// `{output_root}/{job_id}/` holds formatted documents.
#[derive(Debug, Clone)]
pub struct JobStorage {
    upload_root: PathBuf,
    output_root: PathBuf,
}

impl JobStorage {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(upload_root: P, output_root: Q) -> Self {
        Self {
            upload_root: upload_root.as_ref().to_path_buf(),
            output_root: output_root.as_ref().to_path_buf(),
        }
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn upload_dir(&self, job_id: &str) -> PathBuf {
        self.upload_root.join(job_id)
    }

    pub fn output_dir(&self, job_id: &str) -> PathBuf {
        self.output_root.join(job_id)
    }

    /// Creates both roots if missing.
    pub fn ensure_roots(&self) -> Result<(), StorageError> {
        ensure_directory(&self.upload_root)?;
        ensure_directory(&self.output_root)
    }

    /// Creates the input and output directories of a job.
    pub fn create_job_dirs(&self, job_id: &str) -> Result<(), StorageError> {
        ensure_directory(&self.upload_dir(job_id))?;
        ensure_directory(&self.output_dir(job_id))
    }

    /// Writes an uploaded original. A name already used in this job gets a
    /// numeric suffix; the final path is returned.
    pub fn save_input(
        &self,
        job_id: &str,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let filename = sanitize::sanitize_filename(filename)
            .ok_or_else(|| StorageError::InvalidFilename(filename.to_string()))?;
        let dir = self.upload_dir(job_id);
        ensure_directory(&dir)?;

        for counter in 1..=MAX_NAME_ATTEMPTS {
            let try_path = dir.join(numbered_name(&filename, counter));

            // create_new gives an atomic check-and-create (O_CREAT | O_EXCL)
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .map_err(|e| StorageError::WriteFile {
                            path: try_path.clone(),
                            source: e,
                        })?;
                    return Ok(try_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFile {
                        path: try_path,
                        source: e,
                    })
                }
            }
        }

        Err(StorageError::InvalidFilename(filename))
    }

    /// Writes a formatted document without ever exposing a partial file:
    /// the bytes go to a temporary file in the same directory, which is then
    /// renamed into place. Name clashes get a numeric suffix.
    pub fn write_output(
        &self,
        job_id: &str,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        if !sanitize::is_plain_filename(filename) {
            return Err(StorageError::InvalidFilename(filename.to_string()));
        }
        let dir = self.output_dir(job_id);
        ensure_directory(&dir)?;

        let mut temp = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(&dir)
            .map_err(|e| StorageError::WriteFile {
                path: dir.clone(),
                source: e,
            })?;
        temp.write_all(content)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| StorageError::WriteFile {
                path: temp.path().to_path_buf(),
                source: e,
            })?;

        for counter in 1..=MAX_NAME_ATTEMPTS {
            let target = dir.join(numbered_name(filename, counter));
            match temp.persist_noclobber(&target) {
                Ok(_) => return Ok(target),
                Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    temp = err.file;
                }
                Err(err) => {
                    return Err(StorageError::WriteFile {
                        path: target,
                        source: err.error,
                    })
                }
            }
        }

        Err(StorageError::InvalidFilename(filename.to_string()))
    }

    /// Resolves a recorded output name to its path. Names with directory
    /// components never resolve.
    pub fn output_path(&self, job_id: &str, filename: &str) -> Option<PathBuf> {
        if !sanitize::is_plain_filename(filename) {
            return None;
        }
        let path = self.output_dir(job_id).join(filename);
        path.is_file().then_some(path)
    }

    pub fn read_output(&self, job_id: &str, filename: &str) -> Result<Vec<u8>, StorageError> {
        let path = self
            .output_path(job_id, filename)
            .ok_or_else(|| StorageError::InvalidFilename(filename.to_string()))?;
        std::fs::read(&path).map_err(|e| StorageError::ReadFile { path, source: e })
    }

    /// Removes both job directories. Missing directories are not an error.
    pub fn remove_job(&self, job_id: &str) -> Result<(), StorageError> {
        remove_directory(&self.upload_dir(job_id))?;
        remove_directory(&self.output_dir(job_id))
    }

    /// Removes job directories under both roots whose modification time is
    /// older than `max_age`. Returns how many directories were removed.
    /// Individual failures are logged and skipped.
    pub fn cleanup_expired(&self, max_age: Duration) -> usize {
        let now = SystemTime::now();
        let mut removed = 0;

        for root in [&self.upload_root, &self.output_root] {
            if !root.exists() {
                continue;
            }
            for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        log::warn!("Cleanup: failed to read entry under {}: {}", root.display(), e);
                        continue;
                    }
                };
                if !entry.file_type().is_dir() {
                    continue;
                }
                let age = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .and_then(|modified| now.duration_since(modified).ok());

                if matches!(age, Some(age) if age >= max_age) {
                    match remove_directory(entry.path()) {
                        Ok(()) => {
                            log::info!("Cleanup: removed expired job directory {}", entry.path().display());
                            removed += 1;
                        }
                        Err(e) => log::warn!("Cleanup: {}", e),
                    }
                }
            }
        }

        removed
    }
}

fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

fn remove_directory(path: &Path) -> Result<(), StorageError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::RemoveDirectory {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
