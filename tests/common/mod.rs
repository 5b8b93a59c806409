#![allow(dead_code)]

use std::sync::Arc;

use chrono::TimeDelta;
use serde_json::json;

use taskflow::data::{DataNode, InMemoryDataNode};
use taskflow::engine::Scheduler;
use taskflow::events::Notifier;
use taskflow::exec::{SyncWorkerPool, WorkerPool};
use taskflow::task::{FunctionRegistry, Task, TaskFunction};
use taskflow_test_utils::builders;
use taskflow_test_utils::fakes::{CallCounter, ManualWorkerPool};

pub use taskflow_test_utils::init_tracing;

/// `say_hello` concatenates `hello` and `world` into a cacheable
/// `hello_world` valid for one day.
pub struct HelloWorld {
    pub hello: Arc<dyn DataNode>,
    pub world: Arc<dyn DataNode>,
    pub hello_world: Arc<dyn DataNode>,
    pub task: Arc<Task>,
    pub calls: CallCounter,
}

pub fn hello_world() -> HelloWorld {
    let hello = builders::written_node("hello", json!("Hello "));
    let world = builders::written_node("world", json!("world !"));
    let hello_world: Arc<dyn DataNode> = Arc::new(
        InMemoryDataNode::new("hello_world")
            .with_cacheable(true)
            .with_validity_period(TimeDelta::days(1)),
    );
    let calls = CallCounter::new();
    let task = builders::task(
        "say_hello",
        calls.wrap(builtin("concat")),
        &[&hello, &world],
        &[&hello_world],
    );
    HelloWorld {
        hello,
        world,
        hello_world,
        task,
        calls,
    }
}

pub fn builtin(name: &str) -> TaskFunction {
    FunctionRegistry::with_builtins()
        .get(name)
        .expect("builtin function exists")
}

pub fn sync_scheduler() -> Arc<Scheduler> {
    Scheduler::with_pool(Arc::new(SyncWorkerPool), Notifier::default())
}

/// Scheduler whose jobs only complete when the test runs the pool.
pub fn manual_scheduler(workers: usize) -> (Arc<Scheduler>, Arc<ManualWorkerPool>) {
    let pool = ManualWorkerPool::new(workers);
    let scheduler = Scheduler::with_pool(
        Arc::clone(&pool) as Arc<dyn WorkerPool>,
        Notifier::default(),
    );
    (scheduler, pool)
}
