// tests/sequence_waves.rs

mod common;
use crate::common::builtin;

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use taskflow::dag::Sequence;
use taskflow::data::DataNode;
use taskflow::task::Task;
use taskflow_test_utils::builders::{empty_node, task};

fn names(waves: &[Vec<Arc<Task>>]) -> Vec<Vec<String>> {
    waves
        .iter()
        .map(|wave| wave.iter().map(|t| t.config_id().to_string()).collect())
        .collect()
}

#[test]
fn empty_sequence_is_consistent_with_no_waves() {
    let sequence = Sequence::new("empty", Vec::new());
    assert!(sequence.is_consistent());
    assert!(sequence.sorted_tasks().is_empty());
    assert!(sequence.data_nodes().is_empty());
}

#[test]
fn chain_sorts_one_task_per_wave() {
    let d0 = empty_node("d0");
    let d1 = empty_node("d1");
    let d2 = empty_node("d2");
    let d3 = empty_node("d3");
    let t1 = task("t1", builtin("identity"), &[&d0], &[&d1]);
    let t2 = task("t2", builtin("identity"), &[&d1], &[&d2]);
    let t3 = task("t3", builtin("identity"), &[&d2], &[&d3]);

    let sequence = Sequence::new("chain", vec![t3, t1, t2]);
    assert!(sequence.is_consistent());
    assert_eq!(
        names(&sequence.sorted_tasks()),
        vec![vec!["t1"], vec!["t2"], vec!["t3"]]
    );
    assert_eq!(sequence.data_nodes().len(), 4);
}

#[test]
fn independent_producers_share_a_wave() {
    let x = empty_node("x");
    let y = empty_node("y");
    let xy = empty_node("xy");
    let px = task("px", builtin("identity"), &[], &[&x]);
    let py = task("py", builtin("identity"), &[], &[&y]);
    let join = task("join", builtin("concat"), &[&x, &y], &[&xy]);

    let sequence = Sequence::new("join", vec![px, py, join]);
    assert!(sequence.is_consistent());
    assert_eq!(
        names(&sequence.sorted_tasks()),
        vec![vec!["px", "py"], vec!["join"]]
    );
}

#[test]
fn consumer_of_source_and_produced_data_waits_for_producer() {
    let src = empty_node("src");
    let mid = empty_node("mid");
    let out = empty_node("out");
    let first = task("first", builtin("identity"), &[&src], &[&mid]);
    let second = task("second", builtin("concat"), &[&src, &mid], &[&out]);

    let sequence = Sequence::new("mixed", vec![second, first]);
    assert!(sequence.is_consistent());
    assert_eq!(
        names(&sequence.sorted_tasks()),
        vec![vec!["first"], vec!["second"]]
    );
    // `src` is shared but listed once.
    assert_eq!(sequence.data_nodes().len(), 3);
}

#[test]
fn disconnected_tasks_are_inconsistent() {
    let a = empty_node("a");
    let b = empty_node("b");
    let c = empty_node("c");
    let d = empty_node("d");
    let t1 = task("t1", builtin("identity"), &[&a], &[&b]);
    let t2 = task("t2", builtin("identity"), &[&c], &[&d]);

    let sequence = Sequence::new("split", vec![t1, t2]);
    assert!(!sequence.is_consistent());
}

#[test]
fn cycle_is_inconsistent() {
    let a = empty_node("a");
    let b = empty_node("b");
    let t1 = task("t1", builtin("identity"), &[&a], &[&b]);
    let t2 = task("t2", builtin("identity"), &[&b], &[&a]);

    let sequence = Sequence::new("loop", vec![t1, t2]);
    assert!(!sequence.is_consistent());
    assert!(sequence.sorted_tasks().is_empty());
}

#[test]
fn task_lookup_by_name() {
    let a = empty_node("a");
    let b = empty_node("b");
    let t1 = task("t1", builtin("identity"), &[&a], &[&b]);
    let sequence = Sequence::new("single", vec![t1]).with_owner("scenario_1");

    assert_eq!(sequence.task("t1").unwrap().config_id(), "t1");
    assert!(sequence.task("nope").is_err());
    assert_eq!(sequence.owner_id(), Some("scenario_1"));
    assert!(sequence.id().as_str().starts_with("SEQUENCE_single_"));
}

/// Random layered DAG: task `i` writes `d{i}` and reads outputs of a subset
/// of earlier tasks (or a shared source when it reads nothing).
fn layered_dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..8).prop_flat_map(|n| {
        (0..n)
            .map(|i| proptest::sample::subsequence((0..i).collect::<Vec<_>>(), 0..=i))
            .collect::<Vec<_>>()
    })
}

proptest! {
    #[test]
    fn waves_follow_longest_producer_chain(deps in layered_dag()) {
        let source = empty_node("source");
        let outputs: Vec<Arc<dyn DataNode>> = (0..deps.len())
            .map(|i| empty_node(&format!("d{i}")))
            .collect();
        let tasks: Vec<Arc<Task>> = deps
            .iter()
            .enumerate()
            .map(|(i, parents)| {
                let inputs: Vec<&Arc<dyn DataNode>> = if parents.is_empty() {
                    vec![&source]
                } else {
                    parents.iter().map(|p| &outputs[*p]).collect()
                };
                task(&format!("t{i}"), builtin("identity"), &inputs, &[&outputs[i]])
            })
            .collect();

        let mut depth = vec![0usize; deps.len()];
        for (i, parents) in deps.iter().enumerate() {
            depth[i] = parents.iter().map(|p| depth[*p] + 1).max().unwrap_or(0);
        }

        let sequence = Sequence::new("random", tasks.into_iter().rev().collect());
        let waves = sequence.sorted_tasks();

        let mut wave_of: HashMap<String, usize> = HashMap::new();
        for (w, wave) in waves.iter().enumerate() {
            for t in wave {
                wave_of.insert(t.config_id().to_string(), w);
            }
        }
        prop_assert_eq!(wave_of.len(), deps.len());
        for (i, d) in depth.iter().enumerate() {
            prop_assert_eq!(wave_of[&format!("t{i}")], *d);
        }
        for (i, parents) in deps.iter().enumerate() {
            for p in parents {
                let parent_wave = wave_of[&format!("t{p}")];
                let child_wave = wave_of[&format!("t{i}")];
                prop_assert!(parent_wave < child_wave);
            }
        }
    }
}
