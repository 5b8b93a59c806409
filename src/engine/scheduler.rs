// src/engine/scheduler.rs

use std::collections::{HashSet, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::model::CoreSection;
use crate::dag::Sequence;
use crate::errors::{CoreError, Result, panic_message};
use crate::events::{Event, EventEntityType, EventOperation, Notifier};
use crate::exec::{JobDispatcher, WorkerPool, pool_for};
use crate::job::{InMemoryJobRepository, Job, JobCallback, JobManager, JobRepository, JobStatus};
use crate::task::Task;
use crate::types::{DataNodeId, JobId};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Orchestration entry point.
///
/// Turns submissions into jobs, keeps jobs whose inputs are not ready in a
/// blocked list, and drains the ready queue into the dispatcher whenever a
/// worker is free.
///
/// The queues are only drained by whoever holds the run lock. Job
/// completions never wait for that lock: they raise `rescan_requested` and
/// try to take it. Whoever holds the lock re-checks the flag after releasing
/// it, so no completion goes unnoticed and completions fired synchronously
/// inside a dispatch cannot deadlock.
pub struct Scheduler {
    dispatcher: Arc<JobDispatcher>,
    job_manager: Arc<JobManager>,
    jobs_to_run: Mutex<VecDeque<Arc<Job>>>,
    blocked_jobs: Mutex<Vec<Arc<Job>>>,
    /// Failed or cancelled jobs whose outputs must be released.
    abandoned: Mutex<Vec<(JobId, Arc<Task>)>>,
    run_lock: Mutex<()>,
    rescan_requested: AtomicBool,
    accepting: AtomicBool,
    status_hook: JobCallback,
}

impl Scheduler {
    pub fn new(dispatcher: Arc<JobDispatcher>, job_manager: Arc<JobManager>) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<Scheduler>| {
            let me = me.clone();
            let status_hook: JobCallback = Arc::new(move |job: &Job| {
                if let Some(scheduler) = me.upgrade() {
                    scheduler.on_status_change(job);
                }
            });

            Self {
                dispatcher,
                job_manager,
                jobs_to_run: Mutex::new(VecDeque::new()),
                blocked_jobs: Mutex::new(Vec::new()),
                abandoned: Mutex::new(Vec::new()),
                run_lock: Mutex::new(()),
                rescan_requested: AtomicBool::new(false),
                accepting: AtomicBool::new(true),
                status_hook,
            }
        })
    }

    /// Wire a scheduler around `pool` with in-memory job storage.
    pub fn with_pool(pool: Arc<dyn WorkerPool>, notifier: Notifier) -> Arc<Self> {
        let repository: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
        let dispatcher = Arc::new(JobDispatcher::new(
            pool,
            Arc::clone(&repository),
            notifier.clone(),
        ));
        let job_manager = Arc::new(JobManager::new(
            repository,
            Arc::clone(&dispatcher),
            notifier,
        ));
        Self::new(dispatcher, job_manager)
    }

    /// Scheduler with the backend selected by `[core]`.
    pub fn from_config(core: &CoreSection) -> Result<Arc<Self>> {
        let pool = pool_for(core.mode, core.max_nb_of_workers)?;
        info!(
            mode = ?core.mode,
            max_workers = pool.max_workers(),
            "scheduler configured"
        );
        Ok(Self::with_pool(pool, Notifier::new(core.event_capacity)))
    }

    pub fn dispatcher(&self) -> &Arc<JobDispatcher> {
        &self.dispatcher
    }

    pub fn job_manager(&self) -> &Arc<JobManager> {
        &self.job_manager
    }

    pub fn notifier(&self) -> &Notifier {
        self.job_manager.notifier()
    }

    /// Submit every task of `sequence`, wave by wave.
    ///
    /// Returns the jobs in creation order.
    pub fn submit(
        &self,
        sequence: &Sequence,
        callbacks: &[JobCallback],
        force: bool,
    ) -> Result<Vec<Arc<Job>>> {
        self.ensure_accepting()?;
        if !sequence.is_consistent() {
            warn!(sequence = %sequence.config_id(), "submitting an inconsistent sequence");
        }

        info!(sequence = %sequence.config_id(), force, "submitting sequence");
        self.notifier().publish(Event::new(
            EventEntityType::Sequence,
            sequence.id().as_str(),
            EventOperation::Submission,
        ));

        let mut jobs = Vec::new();
        for wave in sequence.sorted_tasks() {
            for task in wave {
                let job = self.enqueue(&task, callbacks, force, sequence.id().to_string())?;
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    /// Submit a single task.
    pub fn submit_task(
        &self,
        task: &Arc<Task>,
        callbacks: &[JobCallback],
        force: bool,
    ) -> Result<Arc<Job>> {
        self.ensure_accepting()?;
        self.notifier().publish(Event::new(
            EventEntityType::Task,
            task.id().as_str(),
            EventOperation::Submission,
        ));
        self.enqueue(task, callbacks, force, task.id().to_string())
    }

    /// `true` iff some input of the task is not ready for reading.
    ///
    /// Accepts a task before submission or a job after it.
    pub fn is_blocked<T: AsRef<Task> + ?Sized>(&self, task_or_job: &T) -> bool {
        task_is_blocked(task_or_job.as_ref())
    }

    /// Cancel a job that has not been dispatched yet.
    ///
    /// Its outputs are released and blocked jobs reading them are cancelled
    /// as well.
    pub fn cancel(&self, job: &Arc<Job>) -> Result<()> {
        let status = job.status();
        if !matches!(
            status,
            JobStatus::Submitted | JobStatus::Blocked | JobStatus::Pending
        ) {
            return Err(CoreError::JobNotCancellable {
                job: job.id().clone(),
                status,
            });
        }

        job.cancelled().map_err(|_| CoreError::JobNotCancellable {
            job: job.id().clone(),
            status: job.status(),
        })?;
        info!(job = %job.id(), previous = %status, "job cancelled");
        self.job_manager.save(job)
    }

    /// Block until every job is finished or `timeout` elapses.
    ///
    /// Returns `true` if all jobs finished.
    pub fn wait(&self, jobs: &[Arc<Job>], timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if jobs.iter().all(|job| job.is_finished()) {
                return true;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return false;
            }
            std::thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    /// Snapshot of jobs waiting for their inputs.
    pub fn blocked_jobs(&self) -> Vec<Arc<Job>> {
        self.blocked_jobs.lock().clone()
    }

    /// Snapshot of the ready queue, front first.
    pub fn queued_jobs(&self) -> Vec<Arc<Job>> {
        self.jobs_to_run.lock().iter().cloned().collect()
    }

    /// Stop dispatching and shut the worker pool down.
    ///
    /// Queued and blocked jobs stay where they are.
    pub fn shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        self.dispatcher.shutdown();
        info!("scheduler shut down");
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.accepting.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CoreError::WorkerPool("scheduler is shut down".to_string()))
        }
    }

    fn enqueue(
        &self,
        task: &Arc<Task>,
        callbacks: &[JobCallback],
        force: bool,
        submit_entity_id: String,
    ) -> Result<Arc<Job>> {
        // Reserve the outputs before the job exists so later submissions see
        // them as not ready.
        for dn in task.outputs() {
            dn.lock_edit();
        }

        let mut all_callbacks = Vec::with_capacity(callbacks.len() + 1);
        all_callbacks.push(Arc::clone(&self.status_hook));
        all_callbacks.extend(callbacks.iter().cloned());

        let job = self
            .job_manager
            .create(task, all_callbacks, force, Some(submit_entity_id))?;

        if self.is_blocked(task) {
            job.blocked()?;
            debug!(job = %job.id(), task = %task.config_id(), "job blocked on inputs");
            self.blocked_jobs.lock().push(Arc::clone(&job));
        } else {
            job.pending()?;
            debug!(job = %job.id(), task = %task.config_id(), "job queued");
            self.jobs_to_run.lock().push_back(Arc::clone(&job));
        }
        self.job_manager.save(&job)?;

        self.run();
        Ok(job)
    }

    /// Drain the ready queue unless another thread is already draining it.
    fn run(&self) {
        self.rescan_requested.store(true, Ordering::SeqCst);
        self.process_deferred();
    }

    fn on_status_change(&self, job: &Job) {
        let status = job.status();
        if !status.is_finished() {
            return;
        }
        if matches!(status, JobStatus::Failed | JobStatus::Cancelled) {
            self.abandoned
                .lock()
                .push((job.id().clone(), Arc::clone(job.task())));
        }
        self.rescan_requested.store(true, Ordering::SeqCst);
        self.process_deferred();
    }

    /// Take the run lock without waiting and drain while rescans are
    /// requested. If the lock is busy the holder picks the request up.
    fn process_deferred(&self) {
        while self.rescan_requested.load(Ordering::SeqCst) {
            let Some(guard) = self.run_lock.try_lock() else {
                return;
            };
            let outcome = catch_unwind(AssertUnwindSafe(|| self.drain_locked()));
            drop(guard);

            if let Err(payload) = outcome {
                error!(
                    panic = %panic_message(payload.as_ref()),
                    "scheduler drain panicked"
                );
                return;
            }
        }
    }

    /// Caller must hold `run_lock`.
    fn drain_locked(&self) {
        loop {
            self.rescan_requested.store(false, Ordering::SeqCst);
            self.release_abandoned();
            self.unblock_ready_jobs();

            if !self.accepting.load(Ordering::SeqCst) || !self.dispatcher.can_execute() {
                break;
            }
            let next = self.jobs_to_run.lock().pop_front();
            let Some(job) = next else {
                break;
            };
            if job.is_finished() {
                // Cancelled while queued.
                continue;
            }
            if let Err(err) = self.dispatcher.dispatch(&job) {
                error!(job = %job.id(), error = %err, "dispatching job failed");
            }
        }
    }

    fn unblock_ready_jobs(&self) {
        let ready: Vec<Arc<Job>> = {
            let mut blocked = self.blocked_jobs.lock();
            blocked.retain(|job| !job.is_finished());
            let (ready, still_blocked): (Vec<_>, Vec<_>) = blocked
                .drain(..)
                .partition(|job| !self.is_blocked(job));
            *blocked = still_blocked;
            ready
        };

        for job in ready {
            match job.pending() {
                Ok(()) => {
                    debug!(job = %job.id(), "job unblocked");
                    if let Err(err) = self.job_manager.save(&job) {
                        warn!(job = %job.id(), error = %err, "saving unblocked job failed");
                    }
                    self.jobs_to_run.lock().push_back(job);
                }
                Err(err) => warn!(job = %job.id(), error = %err, "could not unblock job"),
            }
        }
    }

    /// Release outputs of failed or cancelled jobs and cancel the blocked
    /// jobs that were waiting on them. Cancelling feeds back into
    /// `abandoned`, so the loop runs until the cascade settles.
    fn release_abandoned(&self) {
        loop {
            let batch = std::mem::take(&mut *self.abandoned.lock());
            if batch.is_empty() {
                return;
            }

            for (job_id, task) in batch {
                let outputs: HashSet<DataNodeId> = task
                    .outputs()
                    .iter()
                    .map(|dn| {
                        dn.unlock_edit();
                        dn.id().clone()
                    })
                    .collect();

                let dependents: Vec<Arc<Job>> = {
                    let mut blocked = self.blocked_jobs.lock();
                    let (dependents, rest): (Vec<_>, Vec<_>) =
                        blocked.drain(..).partition(|job| {
                            job.task()
                                .inputs()
                                .iter()
                                .any(|dn| outputs.contains(dn.id()))
                        });
                    *blocked = rest;
                    dependents
                };

                for dependent in dependents {
                    warn!(
                        job = %dependent.id(),
                        upstream = %job_id,
                        "cancelling job waiting on abandoned outputs"
                    );
                    if let Err(err) = dependent
                        .cancelled()
                        .and_then(|()| self.job_manager.save(&dependent))
                    {
                        warn!(job = %dependent.id(), error = %err, "could not cancel dependent job");
                    }
                }
            }
        }
    }
}

fn task_is_blocked(task: &Task) -> bool {
    task.inputs().iter().any(|dn| !dn.is_ready_for_reading())
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("dispatcher", &self.dispatcher)
            .field("queued", &self.jobs_to_run.lock().len())
            .field("blocked", &self.blocked_jobs.lock().len())
            .finish()
    }
}
