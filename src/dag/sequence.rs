// src/dag/sequence.rs

use std::collections::HashSet;
use std::sync::Arc;

use crate::data::DataNode;
use crate::errors::{CoreError, Result};
use crate::task::Task;
use crate::types::SequenceId;

use super::graph::TaskGraph;

/// Ordered collection of tasks submitted together.
#[derive(Debug)]
pub struct Sequence {
    id: SequenceId,
    config_id: String,
    owner_id: Option<String>,
    tasks: Vec<Arc<Task>>,
    graph: TaskGraph,
}

impl Sequence {
    pub fn new(config_id: impl Into<String>, tasks: Vec<Arc<Task>>) -> Self {
        let config_id = config_id.into();
        let graph = TaskGraph::build(&tasks);
        Self {
            id: SequenceId::generate(&config_id),
            config_id,
            owner_id: None,
            tasks,
            graph,
        }
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn id(&self) -> &SequenceId {
        &self.id
    }

    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    /// Task with the given config id.
    pub fn task(&self, name: &str) -> Result<&Arc<Task>> {
        self.tasks
            .iter()
            .find(|t| t.config_id() == name)
            .ok_or_else(|| CoreError::not_found("task", name))
    }

    /// Every data node read or written by the tasks, first use first.
    pub fn data_nodes(&self) -> Vec<Arc<dyn DataNode>> {
        let mut seen = HashSet::new();
        self.tasks
            .iter()
            .flat_map(|t| t.inputs().iter().chain(t.outputs()))
            .filter(|dn| seen.insert(dn.id().clone()))
            .cloned()
            .collect()
    }

    /// Whether the derived graph is a connected DAG alternating data nodes
    /// and tasks. Check this before relying on [`Sequence::sorted_tasks`].
    pub fn is_consistent(&self) -> bool {
        self.graph.is_consistent()
    }

    /// Tasks grouped into waves; every wave only reads data produced by
    /// earlier waves or by nothing in this sequence.
    pub fn sorted_tasks(&self) -> Vec<Vec<Arc<Task>>> {
        self.graph
            .task_waves()
            .into_iter()
            .map(|wave| {
                wave.into_iter()
                    .map(|position| Arc::clone(&self.tasks[position]))
                    .collect()
            })
            .collect()
    }
}
