// src/task/mod.rs

//! Tasks: a function bound to ordered input and output data nodes.

mod registry;

pub use registry::FunctionRegistry;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::data::DataNode;
use crate::errors::{CoreError, Result};
use crate::types::TaskId;

type TaskFn = dyn Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync;

/// User function executed by a task.
///
/// Inputs are passed positionally, in the task's input order. The returned
/// value is mapped onto the outputs: one output receives the whole value,
/// several outputs expect a JSON array of matching length.
#[derive(Clone)]
pub struct TaskFunction {
    name: String,
    f: Arc<TaskFn>,
}

impl TaskFunction {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, inputs: Vec<Value>) -> anyhow::Result<Value> {
        (self.f)(inputs)
    }
}

impl fmt::Debug for TaskFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskFunction").field(&self.name).finish()
    }
}

#[derive(Debug)]
pub struct Task {
    id: TaskId,
    config_id: String,
    owner_id: Option<String>,
    inputs: Vec<Arc<dyn DataNode>>,
    outputs: Vec<Arc<dyn DataNode>>,
    function: TaskFunction,
    skippable: bool,
}

impl Task {
    pub fn builder(config_id: impl Into<String>, function: TaskFunction) -> TaskBuilder {
        TaskBuilder::new(config_id, function)
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn inputs(&self) -> &[Arc<dyn DataNode>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Arc<dyn DataNode>] {
        &self.outputs
    }

    /// Input bound under the given config id.
    pub fn input(&self, name: &str) -> Result<&Arc<dyn DataNode>> {
        find_node(&self.inputs, name).ok_or_else(|| CoreError::not_found("input", name))
    }

    /// Output bound under the given config id.
    pub fn output(&self, name: &str) -> Result<&Arc<dyn DataNode>> {
        find_node(&self.outputs, name).ok_or_else(|| CoreError::not_found("output", name))
    }

    pub fn function(&self) -> &TaskFunction {
        &self.function
    }

    /// Whether the dispatcher may skip this task when its outputs are fresh.
    pub fn skippable(&self) -> bool {
        self.skippable
    }
}

impl AsRef<Task> for Task {
    fn as_ref(&self) -> &Task {
        self
    }
}

fn find_node<'a>(nodes: &'a [Arc<dyn DataNode>], name: &str) -> Option<&'a Arc<dyn DataNode>> {
    nodes.iter().find(|dn| dn.config_id() == name)
}

pub struct TaskBuilder {
    config_id: String,
    owner_id: Option<String>,
    inputs: Vec<Arc<dyn DataNode>>,
    outputs: Vec<Arc<dyn DataNode>>,
    function: TaskFunction,
    skippable: bool,
}

impl TaskBuilder {
    pub fn new(config_id: impl Into<String>, function: TaskFunction) -> Self {
        Self {
            config_id: config_id.into(),
            owner_id: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            function,
            skippable: true,
        }
    }

    pub fn input(mut self, dn: Arc<dyn DataNode>) -> Self {
        self.inputs.push(dn);
        self
    }

    pub fn output(mut self, dn: Arc<dyn DataNode>) -> Self {
        self.outputs.push(dn);
        self
    }

    pub fn owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn skippable(mut self, skippable: bool) -> Self {
        self.skippable = skippable;
        self
    }

    pub fn build(self) -> Arc<Task> {
        Arc::new(Task {
            id: TaskId::generate(&self.config_id),
            config_id: self.config_id,
            owner_id: self.owner_id,
            inputs: self.inputs,
            outputs: self.outputs,
            function: self.function,
            skippable: self.skippable,
        })
    }
}
