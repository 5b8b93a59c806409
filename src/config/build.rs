// src/config/build.rs

//! Turn a validated [`ConfigFile`] into live data nodes, tasks and sequences.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::config::validate::parse_validity;
use crate::dag::Sequence;
use crate::data::{DataNode, InMemoryDataNode};
use crate::errors::{CoreError, Result};
use crate::task::{FunctionRegistry, Task};

/// Entities instantiated from one configuration, looked up by config id.
#[derive(Debug)]
pub struct Workspace {
    data_nodes: BTreeMap<String, Arc<dyn DataNode>>,
    tasks: BTreeMap<String, Arc<Task>>,
    sequences: BTreeMap<String, Sequence>,
}

impl Workspace {
    pub fn build(cfg: &ConfigFile, registry: &FunctionRegistry) -> Result<Self> {
        let mut data_nodes: BTreeMap<String, Arc<dyn DataNode>> = BTreeMap::new();
        for (name, dn_cfg) in cfg.data_node.iter() {
            let mut dn = InMemoryDataNode::new(name.as_str()).with_cacheable(dn_cfg.cacheable);
            if let Some(ref validity) = dn_cfg.validity_period {
                let validity = parse_validity(validity).map_err(CoreError::ConfigError)?;
                dn = dn.with_validity_period(validity);
            }
            if let Some(ref default) = dn_cfg.default {
                dn = dn.with_default(default.clone());
            }
            data_nodes.insert(name.clone(), Arc::new(dn));
        }

        let mut tasks = BTreeMap::new();
        for (name, task_cfg) in cfg.task.iter() {
            let function = registry.get(&task_cfg.function)?;
            let mut builder =
                Task::builder(name.as_str(), function).skippable(task_cfg.effective_skippable());
            for input in task_cfg.inputs.iter() {
                builder = builder.input(lookup(&data_nodes, input)?);
            }
            for output in task_cfg.outputs.iter() {
                builder = builder.output(lookup(&data_nodes, output)?);
            }
            let task = builder.build();
            debug!(task = %name, id = %task.id(), "task built");
            tasks.insert(name.clone(), task);
        }

        let mut sequences = BTreeMap::new();
        for (name, seq_cfg) in cfg.sequence.iter() {
            let members = seq_cfg
                .tasks
                .iter()
                .map(|t| {
                    tasks
                        .get(t)
                        .cloned()
                        .ok_or_else(|| CoreError::not_found("task", t.as_str()))
                })
                .collect::<Result<Vec<_>>>()?;
            sequences.insert(name.clone(), Sequence::new(name.as_str(), members));
        }

        Ok(Self {
            data_nodes,
            tasks,
            sequences,
        })
    }

    pub fn data_node(&self, name: &str) -> Result<&Arc<dyn DataNode>> {
        self.data_nodes
            .get(name)
            .ok_or_else(|| CoreError::not_found("data node", name))
    }

    pub fn task(&self, name: &str) -> Result<&Arc<Task>> {
        self.tasks
            .get(name)
            .ok_or_else(|| CoreError::not_found("task", name))
    }

    pub fn sequence(&self, name: &str) -> Result<&Sequence> {
        self.sequences
            .get(name)
            .ok_or_else(|| CoreError::not_found("sequence", name))
    }

    pub fn data_nodes(&self) -> impl Iterator<Item = (&str, &Arc<dyn DataNode>)> {
        self.data_nodes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn tasks(&self) -> impl Iterator<Item = (&str, &Arc<Task>)> {
        self.tasks.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn sequences(&self) -> impl Iterator<Item = (&str, &Sequence)> {
        self.sequences.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn lookup(nodes: &BTreeMap<String, Arc<dyn DataNode>>, name: &str) -> Result<Arc<dyn DataNode>> {
    nodes
        .get(name)
        .cloned()
        .ok_or_else(|| CoreError::not_found("data node", name))
}
