// src/exec/dispatcher.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::errors::{JobFailure, Result};
use crate::events::Notifier;
use crate::job::{Job, JobRepository, save_unless_deleted};
use crate::task::Task;
use crate::types::JobId;

use super::backend::{Work, WorkHandle, WorkerPool};
use super::task_runner::run_wrapped;

/// Decides whether jobs must run and hands them to a worker pool.
#[derive(Debug)]
pub struct JobDispatcher {
    pool: Arc<dyn WorkerPool>,
    max_workers: usize,
    available_workers: Arc<AtomicUsize>,
    handles: Mutex<HashMap<JobId, WorkHandle>>,
    repository: Arc<dyn JobRepository>,
    notifier: Notifier,
}

impl JobDispatcher {
    pub fn new(
        pool: Arc<dyn WorkerPool>,
        repository: Arc<dyn JobRepository>,
        notifier: Notifier,
    ) -> Self {
        let max_workers = pool.max_workers().max(1);
        Self {
            pool,
            max_workers,
            available_workers: Arc::new(AtomicUsize::new(max_workers)),
            handles: Mutex::new(HashMap::new()),
            repository,
            notifier,
        }
    }

    /// `true` iff at least one worker slot is free.
    pub fn can_execute(&self) -> bool {
        self.available_workers() > 0
    }

    pub fn available_workers(&self) -> usize {
        self.available_workers.load(Ordering::SeqCst)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn needs_to_run(&self, task: &Task) -> bool {
        needs_to_run(task)
    }

    /// Run `job` on a worker, or mark it SKIPPED when its outputs are fresh.
    ///
    /// With the synchronous pool this returns after the job finished.
    pub fn dispatch(&self, job: &Arc<Job>) -> Result<()> {
        let task = job.task();

        if !job.force() && !needs_to_run(task) {
            info!(job = %job.id(), task = %task.config_id(), "outputs up to date; skipping job");
            for dn in task.outputs() {
                dn.unlock_edit();
            }
            job.skipped()?;
            return save_unless_deleted(self.repository.as_ref(), job);
        }

        job.running()?;
        if let Err(err) = save_unless_deleted(self.repository.as_ref(), job) {
            warn!(job = %job.id(), error = %err, "saving running job failed");
        }

        let slot = WorkerSlot::acquire(Arc::clone(&self.available_workers), self.max_workers);
        let work = self.completion_work(job, slot);

        info!(
            job = %job.id(),
            task = %task.config_id(),
            force = job.force(),
            "dispatching job"
        );

        match self.pool.submit(work) {
            Ok(handle) => {
                let mut handles = self.handles.lock();
                handles.retain(|_, h| !h.is_finished());
                if !handle.is_finished() {
                    handles.insert(job.id().clone(), handle);
                }
                Ok(())
            }
            Err(err) => {
                error!(job = %job.id(), error = %err, "worker pool rejected job");
                // The rejected work was dropped, releasing its slot.
                job.failed(vec![JobFailure::TaskFunction(err.to_string())])?;
                save_unless_deleted(self.repository.as_ref(), job)?;
                Err(err)
            }
        }
    }

    /// Drop bookkeeping for a deleted job. Work that has not started is
    /// aborted.
    pub fn forget(&self, job_id: &JobId) -> bool {
        match self.handles.lock().remove(job_id) {
            Some(handle) => {
                handle.abort();
                debug!(job = %job_id, "dispatcher handle removed");
                true
            }
            None => false,
        }
    }

    /// Number of dispatched jobs whose work may still be running.
    pub fn in_flight(&self) -> usize {
        self.handles
            .lock()
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }

    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    fn completion_work(&self, job: &Arc<Job>, slot: WorkerSlot) -> Work {
        let job = Arc::clone(job);
        let repository = Arc::clone(&self.repository);
        let notifier = self.notifier.clone();

        Box::new(move || {
            let failures = run_wrapped(job.id(), job.task(), &notifier);
            drop(slot);
            report_outcome(&job, failures, repository.as_ref());
        })
    }
}

fn report_outcome(job: &Arc<Job>, failures: Vec<JobFailure>, repository: &dyn JobRepository) {
    let result = if failures.is_empty() {
        info!(job = %job.id(), task = %job.task().config_id(), "job completed");
        job.completed()
    } else {
        warn!(
            job = %job.id(),
            task = %job.task().config_id(),
            failures = failures.len(),
            "job failed"
        );
        job.failed(failures)
    };

    if let Err(err) = result.and_then(|()| save_unless_deleted(repository, job)) {
        error!(job = %job.id(), error = %err, "recording job outcome failed");
    }
}

/// One reserved worker slot, handed back when dropped.
#[derive(Debug)]
struct WorkerSlot {
    available: Arc<AtomicUsize>,
    max: usize,
}

impl WorkerSlot {
    fn acquire(available: Arc<AtomicUsize>, max: usize) -> Self {
        let _ = available.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            Some(n.saturating_sub(1))
        });
        Self { available, max }
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        let max = self.max;
        let _ = self
            .available
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some((n + 1).min(max)));
    }
}

/// Skip decision: whether `task` has to run to refresh its outputs.
pub fn needs_to_run(task: &Task) -> bool {
    needs_to_run_at(task, Utc::now())
}

/// [`needs_to_run`] evaluated against a fixed clock.
pub fn needs_to_run_at(task: &Task, now: DateTime<Utc>) -> bool {
    if !task.skippable() {
        return true;
    }

    let outputs = task.outputs();
    if outputs.is_empty() {
        return true;
    }
    if !outputs.iter().all(|dn| dn.is_in_cache_at(now)) {
        return true;
    }

    let inputs = task.inputs();
    if inputs.is_empty() {
        return false;
    }

    let newest_input = inputs.iter().filter_map(|dn| dn.last_edit_date()).max();
    let oldest_output = outputs.iter().filter_map(|dn| dn.last_edit_date()).min();
    match (newest_input, oldest_output) {
        (Some(input), Some(output)) => input > output,
        // Never-written inputs cannot be newer than anything.
        (None, _) => false,
        (Some(_), None) => true,
    }
}
