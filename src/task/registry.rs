// src/task/registry.rs

use std::collections::BTreeMap;

use anyhow::anyhow;
use serde_json::Value;

use crate::errors::{CoreError, Result};

use super::TaskFunction;

/// Named task functions that configuration files can refer to.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, TaskFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `identity`, `concat`, `sum` and `fail`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for function in builtins() {
            // Names below are distinct.
            let _ = registry.register(function);
        }
        registry
    }

    pub fn register(&mut self, function: TaskFunction) -> Result<()> {
        if self.functions.contains_key(function.name()) {
            return Err(CoreError::DuplicateFunction(function.name().to_string()));
        }
        self.functions.insert(function.name().to_string(), function);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<TaskFunction> {
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownFunction(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

fn builtins() -> Vec<TaskFunction> {
    vec![
        TaskFunction::new("identity", |mut inputs| match inputs.len() {
            0 => Ok(Value::Null),
            1 => Ok(inputs.remove(0)),
            _ => Ok(Value::Array(inputs)),
        }),
        TaskFunction::new("concat", |inputs| {
            let mut out = String::new();
            for value in inputs {
                match value {
                    Value::String(s) => out.push_str(&s),
                    other => out.push_str(&other.to_string()),
                }
            }
            Ok(Value::String(out))
        }),
        TaskFunction::new("sum", |inputs| {
            let mut total = 0.0;
            for value in inputs {
                total += value
                    .as_f64()
                    .ok_or_else(|| anyhow!("sum expects numbers, got {value}"))?;
            }
            serde_json::Number::from_f64(total)
                .map(Value::Number)
                .ok_or_else(|| anyhow!("sum is not a finite number"))
        }),
        TaskFunction::new("fail", |_| Err(anyhow!("task configured to fail"))),
    ]
}
