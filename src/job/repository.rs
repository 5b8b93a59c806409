// src/job/repository.rs

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::Result;
use crate::types::JobId;

use super::Job;

/// Persistence contract for jobs.
pub trait JobRepository: Send + Sync + Debug {
    fn save(&self, job: &Arc<Job>) -> Result<()>;
    fn load(&self, id: &JobId) -> Result<Option<Arc<Job>>>;
    fn load_all(&self) -> Result<Vec<Arc<Job>>>;
    fn delete(&self, id: &JobId) -> Result<()>;
}

/// Repository keeping jobs in process memory.
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    jobs: RwLock<HashMap<JobId, Arc<Job>>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobRepository for InMemoryJobRepository {
    fn save(&self, job: &Arc<Job>) -> Result<()> {
        self.jobs.write().insert(job.id().clone(), Arc::clone(job));
        Ok(())
    }

    fn load(&self, id: &JobId) -> Result<Option<Arc<Job>>> {
        Ok(self.jobs.read().get(id).cloned())
    }

    fn load_all(&self) -> Result<Vec<Arc<Job>>> {
        let mut jobs: Vec<Arc<Job>> = self.jobs.read().values().cloned().collect();
        jobs.sort_by_key(|job| job.creation_key());
        Ok(jobs)
    }

    fn delete(&self, id: &JobId) -> Result<()> {
        self.jobs.write().remove(id);
        Ok(())
    }
}

/// Store `job` unless it was deleted.
///
/// The flag is checked again after saving: a delete racing with this save
/// still ends with the job removed.
pub(crate) fn save_unless_deleted(repository: &dyn JobRepository, job: &Arc<Job>) -> Result<()> {
    if job.is_deleted() {
        return Ok(());
    }
    repository.save(job)?;
    if job.is_deleted() {
        repository.delete(job.id())?;
    }
    Ok(())
}
