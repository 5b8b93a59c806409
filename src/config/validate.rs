// src/config/validate.rs

use std::collections::HashMap;
use std::time::Duration;

use chrono::TimeDelta;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CoreError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CoreError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_core(cfg)?;
    validate_data_nodes(cfg)?;
    validate_task_references(cfg)?;
    validate_sequences(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(CoreError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_core(cfg: &RawConfigFile) -> Result<()> {
    if cfg.core.max_nb_of_workers == 0 {
        return Err(CoreError::ConfigError(
            "[core].max_nb_of_workers must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.core.event_capacity == 0 {
        return Err(CoreError::ConfigError(
            "[core].event_capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_data_nodes(cfg: &RawConfigFile) -> Result<()> {
    for (name, dn) in cfg.data_node.iter() {
        if let Some(ref validity) = dn.validity_period {
            parse_validity(validity).map_err(|e| {
                CoreError::ConfigError(format!(
                    "data node '{}' has invalid validity_period: {}",
                    name, e
                ))
            })?;
        }
    }
    Ok(())
}

fn validate_task_references(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.function.trim().is_empty() {
            return Err(CoreError::ConfigError(format!(
                "task '{}' has an empty `function`",
                name
            )));
        }
        for dn in task.inputs.iter().chain(task.outputs.iter()) {
            if !cfg.data_node.contains_key(dn) {
                return Err(CoreError::ConfigError(format!(
                    "task '{}' refers to unknown data node '{}'",
                    name, dn
                )));
            }
        }
        if let Some(dn) = task.inputs.iter().find(|dn| task.outputs.contains(dn)) {
            return Err(CoreError::ConfigError(format!(
                "task '{}' cannot both read and write data node '{}'",
                name, dn
            )));
        }
    }
    Ok(())
}

fn validate_sequences(cfg: &RawConfigFile) -> Result<()> {
    for (name, seq) in cfg.sequence.iter() {
        for task in seq.tasks.iter() {
            if !cfg.task.contains_key(task) {
                return Err(CoreError::ConfigError(format!(
                    "sequence '{}' has unknown task '{}'",
                    name, task
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: producer -> consumer, for every data node one task
    // writes and another reads.
    let mut producers: HashMap<&str, Vec<&str>> = HashMap::new();
    for (name, task) in cfg.task.iter() {
        for dn in task.outputs.iter() {
            producers.entry(dn.as_str()).or_default().push(name.as_str());
        }
    }

    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }
    for (name, task) in cfg.task.iter() {
        for dn in task.inputs.iter() {
            for producer in producers.get(dn.as_str()).into_iter().flatten() {
                graph.add_edge(*producer, name.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(CoreError::DagCycle(format!(
            "cycle detected through data nodes involving task '{}'",
            cycle.node_id()
        ))),
    }
}

/// Parse a validity period such as `"90s"` or `"1d"`.
pub fn parse_validity(s: &str) -> std::result::Result<TimeDelta, String> {
    let duration = parse_duration(s)?;
    TimeDelta::from_std(duration).map_err(|e| format!("duration out of range: {e}"))
}

/// Parse `<number><unit>` with unit `ms`, `s`, `m`, `h` or `d`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let seconds = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{s}' is too large"))
    };

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => seconds(60),
        "h" => seconds(60 * 60),
        "d" => seconds(24 * 60 * 60),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, h, or d",
            unit
        )),
    }
}
