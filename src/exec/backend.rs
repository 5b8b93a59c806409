// src/exec/backend.rs

//! Pluggable worker pool abstraction.
//!
//! The dispatcher talks to a `WorkerPool` instead of a concrete executor so
//! tests can swap in a fake pool that holds work until released.
//!
//! - `SyncWorkerPool` runs each unit of work inline on the submitting thread.
//!   `submit` only returns once the work is done.
//! - `BlockingPool` runs work on a dedicated tokio runtime whose blocking
//!   thread cap equals the configured worker count.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::errors::{CoreError, Result};
use crate::types::JobExecutionMode;

/// A unit of work handed to a pool.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Handle on submitted work.
#[derive(Debug)]
pub enum WorkHandle {
    /// Work already ran to completion.
    Done,
    /// Work runs on a pool thread.
    Spawned(JoinHandle<()>),
    /// Work is tracked by the pool itself.
    Detached,
}

impl WorkHandle {
    pub fn is_finished(&self) -> bool {
        match self {
            WorkHandle::Done => true,
            WorkHandle::Spawned(handle) => handle.is_finished(),
            WorkHandle::Detached => false,
        }
    }

    /// Drop work that has not started yet. Work already running is left
    /// alone.
    pub fn abort(&self) {
        if let WorkHandle::Spawned(handle) = self {
            handle.abort();
        }
    }
}

/// Trait abstracting where dispatched work runs.
pub trait WorkerPool: Send + Sync + Debug {
    fn submit(&self, work: Work) -> Result<WorkHandle>;

    /// Upper bound on concurrently running work.
    fn max_workers(&self) -> usize;

    fn shutdown(&self) {}
}

/// Single worker running everything inline.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncWorkerPool;

impl WorkerPool for SyncWorkerPool {
    fn submit(&self, work: Work) -> Result<WorkHandle> {
        work();
        Ok(WorkHandle::Done)
    }

    fn max_workers(&self) -> usize {
        1
    }
}

/// Bounded pool of worker threads.
#[derive(Debug)]
pub struct BlockingPool {
    runtime: Mutex<Option<Runtime>>,
    max_workers: usize,
}

impl BlockingPool {
    pub fn new(max_workers: usize) -> Result<Self> {
        let max_workers = max_workers.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(max_workers)
            .thread_name("taskflow-worker")
            .build()
            .map_err(|e| CoreError::WorkerPool(format!("building worker runtime: {e}")))?;

        info!(max_workers, "worker pool started");
        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            max_workers,
        })
    }
}

impl WorkerPool for BlockingPool {
    fn submit(&self, work: Work) -> Result<WorkHandle> {
        let guard = self.runtime.lock();
        let runtime = guard
            .as_ref()
            .ok_or_else(|| CoreError::WorkerPool("worker pool is shut down".to_string()))?;
        Ok(WorkHandle::Spawned(runtime.spawn_blocking(work)))
    }

    fn max_workers(&self) -> usize {
        self.max_workers
    }

    fn shutdown(&self) {
        if let Some(runtime) = self.runtime.lock().take() {
            // Running work finishes on its own; nothing waits for it.
            runtime.shutdown_background();
            debug!("worker pool shut down");
        }
    }
}

impl Drop for BlockingPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Pick the backend for the given mode and worker count.
///
/// Development mode and `max_workers <= 1` run synchronously.
pub fn pool_for(mode: JobExecutionMode, max_workers: usize) -> Result<Arc<dyn WorkerPool>> {
    match mode {
        JobExecutionMode::Standalone if max_workers > 1 => {
            Ok(Arc::new(BlockingPool::new(max_workers)?))
        }
        _ => Ok(Arc::new(SyncWorkerPool)),
    }
}
