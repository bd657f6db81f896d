//! Process-scoped job registry.
//!
//! Handlers and the pipeline only see the [`JobRegistry`] trait, so the
//! in-memory map below can be replaced by a persistent store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::RegistryError;
use crate::job::model::Job;

pub trait JobRegistry: Send + Sync {
    /// Registers a new job. Fails if the id is already taken.
    fn create(&self, job: Job) -> Result<(), RegistryError>;

    /// Returns a snapshot of the job.
    fn get(&self, job_id: &str) -> Option<Job>;

    /// Applies `apply` to the stored job under the write lock and returns the
    /// updated snapshot.
    fn update(&self, job_id: &str, apply: &mut dyn FnMut(&mut Job)) -> Result<Job, RegistryError>;

    /// Removes the job and returns its last state.
    fn delete(&self, job_id: &str) -> Result<Job, RegistryError>;

    /// All jobs, newest first.
    fn list(&self) -> Vec<Job>;
}

/// `HashMap` behind a `std::sync::RwLock`. All operations are short and never
/// hold the lock across I/O.
#[derive(Default)]
pub struct InMemoryJobRegistry {
    jobs: RwLock<HashMap<String, Job>>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl JobRegistry for InMemoryJobRegistry {
    fn create(&self, job: Job) -> Result<(), RegistryError> {
        let mut jobs = self.write();
        if jobs.contains_key(&job.job_id) {
            return Err(RegistryError::AlreadyExists(job.job_id));
        }
        log::debug!("Registered job {}", job.job_id);
        jobs.insert(job.job_id.clone(), job);
        Ok(())
    }

    fn get(&self, job_id: &str) -> Option<Job> {
        self.read().get(job_id).cloned()
    }

    fn update(&self, job_id: &str, apply: &mut dyn FnMut(&mut Job)) -> Result<Job, RegistryError> {
        let mut jobs = self.write();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| RegistryError::JobNotFound(job_id.to_string()))?;
        apply(job);
        Ok(job.clone())
    }

    fn delete(&self, job_id: &str) -> Result<Job, RegistryError> {
        self.write()
            .remove(job_id)
            .ok_or_else(|| RegistryError::JobNotFound(job_id.to_string()))
    }

    fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.read().values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }
}
