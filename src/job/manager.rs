// src/job/manager.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::errors::{CoreError, Result};
use crate::events::{Event, EventEntityType, EventOperation, Notifier};
use crate::exec::JobDispatcher;
use crate::task::Task;
use crate::types::JobId;

use super::{Job, JobCallback, JobRepository, JobStatus, save_unless_deleted};

/// Creates, looks up and deletes jobs.
#[derive(Debug)]
pub struct JobManager {
    repository: Arc<dyn JobRepository>,
    dispatcher: Arc<JobDispatcher>,
    notifier: Notifier,
    next_seq: AtomicU64,
}

impl JobManager {
    pub fn new(
        repository: Arc<dyn JobRepository>,
        dispatcher: Arc<JobDispatcher>,
        notifier: Notifier,
    ) -> Self {
        Self {
            repository,
            dispatcher,
            notifier,
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Allocate and persist a new SUBMITTED job for `task`.
    ///
    /// Callbacks are registered in the given order and fire from the first
    /// transition out of SUBMITTED onwards.
    pub fn create(
        &self,
        task: &Arc<Task>,
        callbacks: Vec<JobCallback>,
        force: bool,
        submit_entity_id: Option<String>,
    ) -> Result<Arc<Job>> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let job = Arc::new(Job::new(
            Arc::clone(task),
            force,
            submit_entity_id,
            seq,
            self.notifier.clone(),
        ));
        for callback in callbacks {
            job.add_subscriber(callback);
        }
        self.repository.save(&job)?;

        debug!(job = %job.id(), task = %task.config_id(), force, "job created");
        self.notifier.publish(Event::new(
            EventEntityType::Job,
            job.id().as_str(),
            EventOperation::Creation,
        ));
        Ok(job)
    }

    /// Persist `job`. Deleted jobs are not stored again.
    pub fn save(&self, job: &Arc<Job>) -> Result<()> {
        save_unless_deleted(self.repository.as_ref(), job)
    }

    pub fn get(&self, id: &JobId) -> Result<Option<Arc<Job>>> {
        self.repository.load(id)
    }

    /// All jobs, oldest first.
    pub fn get_all(&self) -> Result<Vec<Arc<Job>>> {
        self.repository.load_all()
    }

    /// Most recently created job of `task`, if any.
    pub fn get_latest(&self, task: &Task) -> Result<Option<Arc<Job>>> {
        let jobs = self.repository.load_all()?;
        Ok(jobs
            .into_iter()
            .filter(|job| job.task().id() == task.id())
            .max_by_key(|job| job.creation_key()))
    }

    pub fn is_deletable(&self, job: &Job) -> bool {
        job.is_finished()
    }

    /// Delete a finished job, or any job when `force` is set.
    ///
    /// A forced delete cancels a job that was not dispatched yet. A running
    /// job keeps running but its outcome is no longer stored.
    pub fn delete(&self, job: &Job, force: bool) -> Result<()> {
        if !force && !self.is_deletable(job) {
            return Err(CoreError::JobNotDeletable(job.id().clone()));
        }

        job.mark_deleted();
        if matches!(
            job.status(),
            JobStatus::Submitted | JobStatus::Blocked | JobStatus::Pending
        ) {
            // The scheduler drops finished jobs from its queues and
            // releases their outputs.
            if let Err(err) = job.cancelled() {
                debug!(job = %job.id(), error = %err, "job finished while being deleted");
            }
        }
        self.dispatcher.forget(job.id());
        self.repository.delete(job.id())?;

        info!(job = %job.id(), status = %job.status(), force, "job deleted");
        self.notifier.publish(Event::new(
            EventEntityType::Job,
            job.id().as_str(),
            EventOperation::Deletion,
        ));
        Ok(())
    }
}
