// src/exec/mod.rs

//! Job execution layer.
//!
//! - [`backend`] provides the `WorkerPool` trait with a synchronous and a
//!   thread-pool implementation; tests can plug in their own pool.
//! - [`task_runner`] runs one task inside a worker and turns every error
//!   into data.
//! - [`dispatcher`] owns the worker accounting and the skip decision.

pub mod backend;
pub mod dispatcher;
pub mod task_runner;

pub use backend::{BlockingPool, SyncWorkerPool, Work, WorkHandle, WorkerPool, pool_for};
pub use dispatcher::{JobDispatcher, needs_to_run, needs_to_run_at};
pub use task_runner::run_wrapped;
