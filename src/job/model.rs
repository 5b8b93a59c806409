// src/job/model.rs

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::{CoreError, JobFailure, Result, panic_message};
use crate::events::{Event, EventEntityType, EventOperation, Notifier};
use crate::task::Task;
use crate::types::JobId;

use super::JobStatus;

/// Status-change subscriber. Receives the job after every transition.
pub type JobCallback = Arc<dyn Fn(&Job) + Send + Sync>;

#[derive(Debug)]
struct JobState {
    status: JobStatus,
    updated_at: DateTime<Utc>,
    failures: Vec<JobFailure>,
}

/// One execution attempt of a [`Task`].
pub struct Job {
    id: JobId,
    task: Arc<Task>,
    force: bool,
    submit_entity_id: Option<String>,
    creation_date: DateTime<Utc>,
    /// Tie-breaker for jobs created within the same clock tick.
    creation_seq: u64,
    state: Mutex<JobState>,
    subscribers: Mutex<Vec<JobCallback>>,
    deleted: AtomicBool,
    notifier: Notifier,
}

impl Job {
    pub(crate) fn new(
        task: Arc<Task>,
        force: bool,
        submit_entity_id: Option<String>,
        creation_seq: u64,
        notifier: Notifier,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::generate(task.config_id()),
            task,
            force,
            submit_entity_id,
            creation_date: now,
            creation_seq,
            state: Mutex::new(JobState {
                status: JobStatus::Submitted,
                updated_at: now,
                failures: Vec::new(),
            }),
            subscribers: Mutex::new(Vec::new()),
            deleted: AtomicBool::new(false),
            notifier,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    /// Bypass the skip decision when dispatched.
    pub fn force(&self) -> bool {
        self.force
    }

    /// Id of the sequence or task whose submission created this job.
    pub fn submit_entity_id(&self) -> Option<&str> {
        self.submit_entity_id.as_deref()
    }

    pub fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    /// Total order over jobs of one manager: creation date, then creation
    /// sequence.
    pub fn creation_key(&self) -> (DateTime<Utc>, u64) {
        (self.creation_date, self.creation_seq)
    }

    pub fn status(&self) -> JobStatus {
        self.state.lock().status
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.state.lock().updated_at
    }

    /// Failures captured while executing the job.
    pub fn failures(&self) -> Vec<JobFailure> {
        self.state.lock().failures.clone()
    }

    pub fn is_submitted(&self) -> bool {
        self.status() == JobStatus::Submitted
    }

    pub fn is_blocked(&self) -> bool {
        self.status() == JobStatus::Blocked
    }

    pub fn is_pending(&self) -> bool {
        self.status() == JobStatus::Pending
    }

    pub fn is_running(&self) -> bool {
        self.status() == JobStatus::Running
    }

    pub fn is_completed(&self) -> bool {
        self.status() == JobStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status() == JobStatus::Failed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == JobStatus::Cancelled
    }

    pub fn is_skipped(&self) -> bool {
        self.status() == JobStatus::Skipped
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_finished()
    }

    /// Set once the job manager deleted the job. A deleted job is never
    /// stored again.
    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::SeqCst);
    }

    pub fn add_subscriber(&self, callback: JobCallback) {
        self.subscribers.lock().push(callback);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn blocked(&self) -> Result<()> {
        self.transition(JobStatus::Blocked, Vec::new())
    }

    pub fn pending(&self) -> Result<()> {
        self.transition(JobStatus::Pending, Vec::new())
    }

    pub fn running(&self) -> Result<()> {
        self.transition(JobStatus::Running, Vec::new())
    }

    pub fn completed(&self) -> Result<()> {
        self.transition(JobStatus::Completed, Vec::new())
    }

    pub fn failed(&self, failures: Vec<JobFailure>) -> Result<()> {
        self.transition(JobStatus::Failed, failures)
    }

    pub fn cancelled(&self) -> Result<()> {
        self.transition(JobStatus::Cancelled, Vec::new())
    }

    pub fn skipped(&self) -> Result<()> {
        self.transition(JobStatus::Skipped, Vec::new())
    }

    fn transition(&self, next: JobStatus, failures: Vec<JobFailure>) -> Result<()> {
        let previous = {
            let mut state = self.state.lock();
            let previous = state.status;
            if !previous.can_transition_to(next) {
                return Err(CoreError::InvalidTransition {
                    job: self.id.clone(),
                    from: previous,
                    to: next,
                });
            }
            state.status = next;
            state.updated_at = Utc::now();
            state.failures.extend(failures);
            previous
        };

        debug!(job = %self.id, from = %previous, to = %next, "job status changed");

        self.notifier.publish(
            Event::new(EventEntityType::Job, self.id.as_str(), EventOperation::Update)
                .with_attribute("status", json!(next.as_str())),
        );
        self.notify_subscribers();
        Ok(())
    }

    /// Snapshot the subscriber list, then call each in registration order.
    /// Subscribers added while notifying only see later transitions.
    fn notify_subscribers(&self) {
        let snapshot: Vec<JobCallback> = self.subscribers.lock().clone();
        for callback in snapshot {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(self))) {
                warn!(
                    job = %self.id,
                    panic = %panic_message(payload.as_ref()),
                    "job status subscriber panicked"
                );
            }
        }
    }
}

impl AsRef<Task> for Job {
    fn as_ref(&self) -> &Task {
        &self.task
    }
}

impl AsRef<Task> for Arc<Job> {
    fn as_ref(&self) -> &Task {
        &self.task
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("task", &self.task.config_id())
            .field("force", &self.force)
            .field("status", &self.status())
            .field("creation_date", &self.creation_date)
            .finish()
    }
}
