// src/job/mod.rs

//! Jobs and their bookkeeping.
//!
//! - [`status`] is the job state machine.
//! - [`model`] holds the `Job` entity and its status-change subscribers.
//! - [`repository`] is the persistence contract plus an in-memory store.
//! - [`manager`] creates, queries and deletes jobs.

pub mod manager;
pub mod model;
pub mod repository;
pub mod status;

pub use manager::JobManager;
pub use model::{Job, JobCallback};
pub use repository::{InMemoryJobRepository, JobRepository};
pub(crate) use repository::save_unless_deleted;
pub use status::JobStatus;
