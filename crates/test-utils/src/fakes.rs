use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use taskflow::data::{DataNode, InMemoryDataNode};
use taskflow::errors::{DataNodeError, Result};
use taskflow::exec::{Work, WorkHandle, WorkerPool};
use taskflow::job::{Job, JobCallback, JobStatus};
use taskflow::task::TaskFunction;
use taskflow::types::{DataNodeId, JobId};

/// A fake worker pool that:
/// - queues submitted work instead of running it
/// - runs queued work only when the test asks for it
///
/// This gives tests full control over when jobs complete.
pub struct ManualWorkerPool {
    max_workers: usize,
    queue: Mutex<VecDeque<Work>>,
}

impl ManualWorkerPool {
    pub fn new(max_workers: usize) -> Arc<Self> {
        Arc::new(Self {
            max_workers,
            queue: Mutex::new(VecDeque::new()),
        })
    }

    /// Number of submitted, not yet run, units of work.
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run the oldest queued unit of work. Returns `false` if none.
    pub fn run_next(&self) -> bool {
        // Release the lock first: finishing work may submit more.
        let next = self.queue.lock().pop_front();
        match next {
            Some(work) => {
                work();
                true
            }
            None => false,
        }
    }

    /// Run until the queue stays empty. Returns how many units ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl fmt::Debug for ManualWorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualWorkerPool")
            .field("max_workers", &self.max_workers)
            .field("queued", &self.queued())
            .finish()
    }
}

impl WorkerPool for ManualWorkerPool {
    fn submit(&self, work: Work) -> Result<WorkHandle> {
        self.queue.lock().push_back(work);
        Ok(WorkHandle::Detached)
    }

    fn max_workers(&self) -> usize {
        self.max_workers
    }
}

/// Counts how often the functions it wraps are called.
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    calls: Arc<AtomicUsize>,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn wrap(&self, function: TaskFunction) -> TaskFunction {
        let calls = Arc::clone(&self.calls);
        let name = function.name().to_string();
        TaskFunction::new(name, move |inputs| {
            calls.fetch_add(1, Ordering::SeqCst);
            function.call(inputs)
        })
    }
}

/// Records every status a job goes through.
#[derive(Debug, Clone, Default)]
pub struct StatusRecorder {
    seen: Arc<Mutex<Vec<(JobId, JobStatus)>>>,
}

impl StatusRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> JobCallback {
        let seen = Arc::clone(&self.seen);
        Arc::new(move |job: &Job| {
            seen.lock().push((job.id().clone(), job.status()));
        })
    }

    /// Statuses observed for `job`, in order.
    pub fn statuses_of(&self, job: &JobId) -> Vec<JobStatus> {
        self.seen
            .lock()
            .iter()
            .filter(|(id, _)| id == job)
            .map(|(_, status)| *status)
            .collect()
    }
}

/// Data node whose writes always fail; everything else is in-memory.
#[derive(Debug)]
pub struct FailingWriteNode {
    inner: InMemoryDataNode,
}

impl FailingWriteNode {
    pub fn new(name: &str) -> Arc<dyn DataNode> {
        Arc::new(Self {
            inner: InMemoryDataNode::new(name),
        })
    }
}

impl DataNode for FailingWriteNode {
    fn id(&self) -> &DataNodeId {
        self.inner.id()
    }

    fn config_id(&self) -> &str {
        self.inner.config_id()
    }

    fn last_edit_date(&self) -> Option<DateTime<Utc>> {
        self.inner.last_edit_date()
    }

    fn edit_in_progress(&self) -> bool {
        self.inner.edit_in_progress()
    }

    fn validity_period(&self) -> Option<TimeDelta> {
        self.inner.validity_period()
    }

    fn cacheable(&self) -> bool {
        self.inner.cacheable()
    }

    fn read(&self) -> std::result::Result<Value, DataNodeError> {
        self.inner.read()
    }

    fn write(&self, _value: Value, _job_id: Option<&JobId>) -> std::result::Result<(), DataNodeError> {
        Err(DataNodeError::WriteFailed {
            data_node: self.id().clone(),
            reason: "storage unavailable".to_string(),
        })
    }

    fn lock_edit(&self) {
        self.inner.lock_edit()
    }

    fn unlock_edit(&self) {
        self.inner.unlock_edit()
    }

    fn job_ids(&self) -> Vec<JobId> {
        self.inner.job_ids()
    }
}
