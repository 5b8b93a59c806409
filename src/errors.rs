// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::job::JobStatus;
use crate::types::{DataNodeId, JobId};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("Job {job} cannot go from {from} to {to}")]
    InvalidTransition {
        job: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {0} is not finished and cannot be deleted")]
    JobNotDeletable(JobId),

    #[error("Job {job} is {status} and cannot be cancelled")]
    JobNotCancellable { job: JobId, status: JobStatus },

    #[error("Unknown task function: {0}")]
    UnknownFunction(String),

    #[error("Task function registered twice: {0}")]
    DuplicateFunction(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    DataNode(#[from] DataNodeError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            name: name.into(),
        }
    }
}

/// Outcome of the data node read/write contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataNodeError {
    #[error("data node {0} has never been written")]
    NoData(DataNodeId),

    #[error("reading data node {data_node} failed: {reason}")]
    ReadFailed { data_node: DataNodeId, reason: String },

    #[error("writing data node {data_node} failed: {reason}")]
    WriteFailed { data_node: DataNodeId, reason: String },
}

/// One captured failure of a job execution.
///
/// Worker-side errors are never raised to the scheduler; they are collected
/// into the job as a list of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobFailure {
    #[error("input {0} has no data")]
    NoData(DataNodeId),

    #[error("reading input {data_node} failed: {reason}")]
    ReadFailed { data_node: DataNodeId, reason: String },

    #[error("task function failed: {0}")]
    TaskFunction(String),

    #[error("task function panicked: {0}")]
    TaskPanicked(String),

    #[error("error writing data node {data_node}: {reason}")]
    DataNodeWriting { data_node: DataNodeId, reason: String },
}

impl JobFailure {
    pub fn is_data_node_writing(&self) -> bool {
        matches!(self, JobFailure::DataNodeWriting { .. })
    }
}

impl From<DataNodeError> for JobFailure {
    fn from(err: DataNodeError) -> Self {
        match err {
            DataNodeError::NoData(id) => JobFailure::NoData(id),
            DataNodeError::ReadFailed { data_node, reason } => {
                JobFailure::ReadFailed { data_node, reason }
            }
            DataNodeError::WriteFailed { data_node, reason } => {
                JobFailure::DataNodeWriting { data_node, reason }
            }
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CoreError>;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
