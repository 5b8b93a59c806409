// src/data/mod.rs

//! Data node contract consumed by the orchestration core.
//!
//! A data node is a handle to a dataset, not the data itself. The core only
//! looks at freshness (`last_edit_date`, validity) and at the edit lock, and
//! moves values between nodes through `read` / `write`.

mod memory;

pub use memory::InMemoryDataNode;

use std::fmt::Debug;

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;

use crate::errors::DataNodeError;
use crate::types::{DataNodeId, JobId};

pub trait DataNode: Send + Sync + Debug {
    fn id(&self) -> &DataNodeId;

    /// Name of the template this node was created from.
    fn config_id(&self) -> &str;

    /// `None` until the node is written for the first time.
    fn last_edit_date(&self) -> Option<DateTime<Utc>>;

    fn edit_in_progress(&self) -> bool;

    fn validity_period(&self) -> Option<TimeDelta>;

    fn cacheable(&self) -> bool;

    fn read(&self) -> Result<Value, DataNodeError>;

    /// Store `value`, stamp the edit date, release the edit lock and record
    /// the job that produced it (if any).
    fn write(&self, value: Value, job_id: Option<&JobId>) -> Result<(), DataNodeError>;

    fn lock_edit(&self);

    fn unlock_edit(&self);

    /// Jobs that wrote this node, oldest first.
    fn job_ids(&self) -> Vec<JobId>;

    fn is_ready_for_reading(&self) -> bool {
        !self.edit_in_progress() && self.last_edit_date().is_some()
    }

    fn is_in_cache(&self) -> bool {
        self.is_in_cache_at(Utc::now())
    }

    fn is_in_cache_at(&self, now: DateTime<Utc>) -> bool {
        if !self.cacheable() {
            return false;
        }
        let Some(last_edit) = self.last_edit_date() else {
            return false;
        };
        match self.validity_period() {
            None => true,
            Some(validity) => match last_edit.checked_add_signed(validity) {
                Some(expires) => now <= expires,
                // Validity too large to represent: never expires.
                None => true,
            },
        }
    }
}
