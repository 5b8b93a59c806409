// src/data/memory.rs

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

use crate::errors::DataNodeError;
use crate::types::{DataNodeId, JobId};

use super::DataNode;

#[derive(Debug, Default)]
struct NodeState {
    data: Option<Value>,
    last_edit_date: Option<DateTime<Utc>>,
    edit_in_progress: bool,
    job_ids: Vec<JobId>,
}

/// Data node keeping its value in process memory.
#[derive(Debug)]
pub struct InMemoryDataNode {
    id: DataNodeId,
    config_id: String,
    cacheable: bool,
    validity_period: Option<TimeDelta>,
    state: RwLock<NodeState>,
}

impl InMemoryDataNode {
    pub fn new(config_id: impl Into<String>) -> Self {
        let config_id = config_id.into();
        Self {
            id: DataNodeId::generate(&config_id),
            config_id,
            cacheable: false,
            validity_period: None,
            state: RwLock::new(NodeState::default()),
        }
    }

    /// Start with `value` already written, as if edited at creation time.
    pub fn with_default(self, value: Value) -> Self {
        {
            let mut state = self.state.write();
            state.data = Some(value);
            state.last_edit_date = Some(Utc::now());
        }
        self
    }

    pub fn with_cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }

    pub fn with_validity_period(mut self, validity: TimeDelta) -> Self {
        self.validity_period = Some(validity);
        self
    }

    /// Overwrite the edit date, e.g. to replay a known history.
    pub fn set_last_edit_date(&self, date: DateTime<Utc>) {
        self.state.write().last_edit_date = Some(date);
    }
}

impl DataNode for InMemoryDataNode {
    fn id(&self) -> &DataNodeId {
        &self.id
    }

    fn config_id(&self) -> &str {
        &self.config_id
    }

    fn last_edit_date(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_edit_date
    }

    fn edit_in_progress(&self) -> bool {
        self.state.read().edit_in_progress
    }

    fn validity_period(&self) -> Option<TimeDelta> {
        self.validity_period
    }

    fn cacheable(&self) -> bool {
        self.cacheable
    }

    fn read(&self) -> Result<Value, DataNodeError> {
        let state = self.state.read();
        match (&state.data, state.last_edit_date) {
            (Some(value), Some(_)) => Ok(value.clone()),
            _ => Err(DataNodeError::NoData(self.id.clone())),
        }
    }

    fn write(&self, value: Value, job_id: Option<&JobId>) -> Result<(), DataNodeError> {
        let mut state = self.state.write();
        state.data = Some(value);
        state.last_edit_date = Some(Utc::now());
        state.edit_in_progress = false;
        if let Some(job_id) = job_id {
            state.job_ids.push(job_id.clone());
        }
        trace!(data_node = %self.id, job = ?job_id, "data node written");
        Ok(())
    }

    fn lock_edit(&self) {
        self.state.write().edit_in_progress = true;
    }

    fn unlock_edit(&self) {
        self.state.write().edit_in_progress = false;
    }

    fn job_ids(&self) -> Vec<JobId> {
        self.state.read().job_ids.clone()
    }
}
