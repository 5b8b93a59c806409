// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::types::JobExecutionMode;

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [core]
/// mode = "standalone"
/// max_nb_of_workers = 2
///
/// [data_node.hello]
/// default = "Hello "
///
/// [data_node.hello_world]
/// cacheable = true
/// validity_period = "1d"
///
/// [task.say_hello]
/// function = "concat"
/// inputs = ["hello", "world"]
/// outputs = ["hello_world"]
///
/// [sequence.greeting]
/// tasks = ["say_hello"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub core: CoreSection,

    /// Keys are data node config ids.
    #[serde(default)]
    pub data_node: BTreeMap<String, DataNodeConfig>,

    /// Keys are task config ids.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    #[serde(default)]
    pub sequence: BTreeMap<String, SequenceConfig>,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub core: CoreSection,
    pub data_node: BTreeMap<String, DataNodeConfig>,
    pub task: BTreeMap<String, TaskConfig>,
    pub sequence: BTreeMap<String, SequenceConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            core: raw.core,
            data_node: raw.data_node,
            task: raw.task,
            sequence: raw.sequence,
        }
    }
}

/// `[core]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreSection {
    #[serde(default)]
    pub mode: JobExecutionMode,

    /// Parallel job cap. Values `<= 1` run jobs synchronously.
    #[serde(default = "default_max_nb_of_workers")]
    pub max_nb_of_workers: usize,

    /// Buffer size of the event bus.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_max_nb_of_workers() -> usize {
    1
}

fn default_event_capacity() -> usize {
    crate::events::notifier::DEFAULT_EVENT_CAPACITY
}

impl Default for CoreSection {
    fn default() -> Self {
        Self {
            mode: JobExecutionMode::default(),
            max_nb_of_workers: default_max_nb_of_workers(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// `[data_node.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataNodeConfig {
    /// Initial value. A node with a default counts as written at creation.
    #[serde(default)]
    pub default: Option<Value>,

    #[serde(default)]
    pub cacheable: bool,

    /// Duration string such as `"30m"` or `"1d"`.
    #[serde(default)]
    pub validity_period: Option<String>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Name in the function registry.
    pub function: String,

    /// Data node names, bound positionally to the function arguments.
    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default)]
    pub skippable: Option<bool>,
}

impl TaskConfig {
    /// Tasks are skippable unless configured otherwise.
    pub fn effective_skippable(&self) -> bool {
        self.skippable.unwrap_or(true)
    }
}

/// `[sequence.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SequenceConfig {
    #[serde(default)]
    pub tasks: Vec<String>,
}
