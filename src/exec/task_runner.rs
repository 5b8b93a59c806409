// src/exec/task_runner.rs

//! Task execution wrapper run inside a worker.
//!
//! Every stage (reading inputs, calling the function, writing outputs) is
//! guarded: errors and panics become [`JobFailure`] values instead of
//! escaping the worker.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::errors::{JobFailure, panic_message};
use crate::events::{Event, EventEntityType, EventOperation, Notifier};
use crate::task::Task;
use crate::types::JobId;

/// Run `task` for `job_id` and return the captured failures.
///
/// An empty list means every output was written.
pub fn run_wrapped(job_id: &JobId, task: &Task, notifier: &Notifier) -> Vec<JobFailure> {
    let inputs = match read_inputs(task) {
        Ok(inputs) => inputs,
        Err(failures) => return failures,
    };

    let value = match call_function(task, inputs) {
        Ok(value) => value,
        Err(failure) => return vec![failure],
    };

    write_outputs(job_id, task, value, notifier)
}

fn read_inputs(task: &Task) -> Result<Vec<Value>, Vec<JobFailure>> {
    let mut values = Vec::with_capacity(task.inputs().len());
    let mut failures = Vec::new();

    for dn in task.inputs() {
        match catch_unwind(AssertUnwindSafe(|| dn.read())) {
            Ok(Ok(value)) => values.push(value),
            Ok(Err(err)) => failures.push(JobFailure::from(err)),
            Err(payload) => failures.push(JobFailure::ReadFailed {
                data_node: dn.id().clone(),
                reason: panic_message(payload.as_ref()),
            }),
        }
    }

    if failures.is_empty() {
        Ok(values)
    } else {
        Err(failures)
    }
}

fn call_function(task: &Task, inputs: Vec<Value>) -> Result<Value, JobFailure> {
    let function = task.function();
    debug!(task = %task.config_id(), function = %function.name(), "calling task function");

    match catch_unwind(AssertUnwindSafe(|| function.call(inputs))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(JobFailure::TaskFunction(format!("{err:#}"))),
        Err(payload) => Err(JobFailure::TaskPanicked(panic_message(payload.as_ref()))),
    }
}

/// Map a returned value onto `outputs` outputs by position.
fn bind_outputs(value: Value, outputs: usize) -> Result<Vec<Value>, String> {
    match outputs {
        0 => Ok(Vec::new()),
        1 => Ok(vec![value]),
        n => match value {
            Value::Array(items) if items.len() == n => Ok(items),
            Value::Array(items) => Err(format!(
                "task returned {} values for {n} outputs",
                items.len()
            )),
            _ => Err(format!("task returned a single value for {n} outputs")),
        },
    }
}

fn write_outputs(job_id: &JobId, task: &Task, value: Value, notifier: &Notifier) -> Vec<JobFailure> {
    let outputs = task.outputs();
    let values = match bind_outputs(value, outputs.len()) {
        Ok(values) => values,
        Err(reason) => {
            warn!(job = %job_id, task = %task.config_id(), %reason, "output arity mismatch");
            return outputs
                .iter()
                .map(|dn| JobFailure::DataNodeWriting {
                    data_node: dn.id().clone(),
                    reason: reason.clone(),
                })
                .collect();
        }
    };

    let mut failures = Vec::new();
    for (dn, value) in outputs.iter().zip(values) {
        let reason = match catch_unwind(AssertUnwindSafe(|| dn.write(value, Some(job_id)))) {
            Ok(Ok(())) => {
                notifier.publish(
                    Event::new(EventEntityType::DataNode, dn.id().as_str(), EventOperation::Update)
                        .with_attribute("last_edit_date", json!(dn.last_edit_date())),
                );
                continue;
            }
            Ok(Err(err)) => err.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };
        warn!(job = %job_id, data_node = %dn.id(), %reason, "writing output failed");
        failures.push(JobFailure::DataNodeWriting {
            data_node: dn.id().clone(),
            reason,
        });
    }
    failures
}
