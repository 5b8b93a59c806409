#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use taskflow::config::{
    ConfigFile, CoreSection, DataNodeConfig, RawConfigFile, SequenceConfig, TaskConfig,
};
use taskflow::data::{DataNode, InMemoryDataNode};
use taskflow::task::{Task, TaskFunction};
use taskflow::types::JobExecutionMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                core: CoreSection::default(),
                data_node: BTreeMap::new(),
                task: BTreeMap::new(),
                sequence: BTreeMap::new(),
            },
        }
    }

    pub fn standalone(mut self, workers: usize) -> Self {
        self.config.core.mode = JobExecutionMode::Standalone;
        self.config.core.max_nb_of_workers = workers;
        self
    }

    pub fn with_data_node(mut self, name: &str, dn: DataNodeConfig) -> Self {
        self.config.data_node.insert(name.to_string(), dn);
        self
    }

    /// Plain data node without default value.
    pub fn with_node(self, name: &str) -> Self {
        self.with_data_node(name, DataNodeConfig::default())
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_sequence(mut self, name: &str, tasks: &[&str]) -> Self {
        self.config.sequence.insert(
            name.to_string(),
            SequenceConfig {
                tasks: tasks.iter().map(|t| t.to_string()).collect(),
            },
        );
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(function: &str) -> Self {
        Self {
            task: TaskConfig {
                function: function.to_string(),
                inputs: vec![],
                outputs: vec![],
                skippable: None,
            },
        }
    }

    pub fn input(mut self, dn: &str) -> Self {
        self.task.inputs.push(dn.to_string());
        self
    }

    pub fn output(mut self, dn: &str) -> Self {
        self.task.outputs.push(dn.to_string());
        self
    }

    pub fn skippable(mut self, val: bool) -> Self {
        self.task.skippable = Some(val);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Never-written in-memory node.
pub fn empty_node(name: &str) -> Arc<dyn DataNode> {
    Arc::new(InMemoryDataNode::new(name))
}

/// Node already holding `value`.
pub fn written_node(name: &str, value: Value) -> Arc<dyn DataNode> {
    Arc::new(InMemoryDataNode::new(name).with_default(value))
}

/// Cacheable node without validity limit.
pub fn cacheable_node(name: &str) -> Arc<dyn DataNode> {
    Arc::new(InMemoryDataNode::new(name).with_cacheable(true))
}

/// Task wired to the given nodes.
pub fn task(
    name: &str,
    function: TaskFunction,
    inputs: &[&Arc<dyn DataNode>],
    outputs: &[&Arc<dyn DataNode>],
) -> Arc<Task> {
    let mut builder = Task::builder(name, function);
    for dn in inputs {
        builder = builder.input(Arc::clone(dn));
    }
    for dn in outputs {
        builder = builder.output(Arc::clone(dn));
    }
    builder.build()
}
