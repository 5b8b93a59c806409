// tests/skip_decision.rs

mod common;
use crate::common::builtin;

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use taskflow::data::{DataNode, InMemoryDataNode};
use taskflow::exec::needs_to_run_at;
use taskflow::task::Task;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

/// Node last edited `offset` seconds after `t0`.
fn edited(name: &str, offset: i64, cacheable: bool) -> Arc<InMemoryDataNode> {
    let dn = InMemoryDataNode::new(name).with_cacheable(cacheable);
    dn.set_last_edit_date(t0() + TimeDelta::seconds(offset));
    Arc::new(dn)
}

fn build(inputs: &[Arc<InMemoryDataNode>], outputs: &[Arc<InMemoryDataNode>]) -> Arc<Task> {
    let mut builder = Task::builder("t", builtin("identity"));
    for dn in inputs {
        builder = builder.input(Arc::clone(dn) as Arc<dyn DataNode>);
    }
    for dn in outputs {
        builder = builder.output(Arc::clone(dn) as Arc<dyn DataNode>);
    }
    builder.build()
}

fn now() -> DateTime<Utc> {
    t0() + TimeDelta::hours(1)
}

#[test]
fn task_without_outputs_always_runs() {
    let task = build(&[edited("in", 0, true)], &[]);
    assert!(needs_to_run_at(&task, now()));
}

#[test]
fn uncached_output_forces_a_run() {
    let never_written = Arc::new(InMemoryDataNode::new("fresh").with_cacheable(true));
    let task = build(&[edited("in", 0, true)], &[never_written]);
    assert!(needs_to_run_at(&task, now()));

    let not_cacheable = build(&[edited("in", 0, true)], &[edited("out", 10, false)]);
    assert!(needs_to_run_at(&not_cacheable, now()));
}

#[test]
fn cached_outputs_without_inputs_are_skipped() {
    let task = build(&[], &[edited("out", 0, true)]);
    assert!(!needs_to_run_at(&task, now()));
}

#[test]
fn expired_validity_period_forces_a_run() {
    let out = InMemoryDataNode::new("out")
        .with_cacheable(true)
        .with_validity_period(TimeDelta::minutes(30));
    out.set_last_edit_date(t0());
    let task = build(&[edited("in", -60, true)], &[Arc::new(out)]);

    assert!(!needs_to_run_at(&task, t0() + TimeDelta::minutes(30)));
    assert!(needs_to_run_at(&task, t0() + TimeDelta::minutes(31)));
}

#[test]
fn newest_input_is_compared_with_oldest_output() {
    // Inputs at 10 and 30, outputs at 20 and 40: 30 > 20, must run.
    let task = build(
        &[edited("i1", 10, true), edited("i2", 30, true)],
        &[edited("o1", 20, true), edited("o2", 40, true)],
    );
    assert!(needs_to_run_at(&task, now()));

    // Same edit time is not newer.
    let tie = build(&[edited("i", 20, true)], &[edited("o", 20, true)]);
    assert!(!needs_to_run_at(&tie, now()));
}

#[test]
fn non_skippable_task_always_runs() {
    let out = edited("out", 0, true);
    let task = Task::builder("t", builtin("identity"))
        .output(out as Arc<dyn DataNode>)
        .skippable(false)
        .build();
    assert!(!task.skippable());
    assert!(needs_to_run_at(&task, now()));
}

proptest! {
    #[test]
    fn decision_matches_max_input_vs_min_output(
        inputs in proptest::collection::vec(-1000i64..1000, 1..5),
        outputs in proptest::collection::vec(-1000i64..1000, 1..5),
    ) {
        let in_nodes: Vec<_> = inputs.iter().enumerate()
            .map(|(i, off)| edited(&format!("in{i}"), *off, true))
            .collect();
        let out_nodes: Vec<_> = outputs.iter().enumerate()
            .map(|(i, off)| edited(&format!("out{i}"), *off, true))
            .collect();
        let task = build(&in_nodes, &out_nodes);

        let expected = inputs.iter().max() > outputs.iter().min();
        let first = needs_to_run_at(&task, now());
        prop_assert_eq!(first, expected);
        // Read-only: asking again gives the same answer.
        prop_assert_eq!(needs_to_run_at(&task, now()), first);
    }

    #[test]
    fn outputs_out_of_cache_always_run(
        inputs in proptest::collection::vec(-1000i64..1000, 0..4),
        cached in proptest::collection::vec(any::<bool>(), 1..4),
    ) {
        prop_assume!(cached.iter().any(|c| !c));
        let in_nodes: Vec<_> = inputs.iter().enumerate()
            .map(|(i, off)| edited(&format!("in{i}"), *off, true))
            .collect();
        let out_nodes: Vec<_> = cached.iter().enumerate()
            .map(|(i, c)| edited(&format!("out{i}"), 5000, *c))
            .collect();
        let task = build(&in_nodes, &out_nodes);

        prop_assert!(needs_to_run_at(&task, now()));
    }
}
