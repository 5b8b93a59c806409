// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod data;
pub mod engine;
pub mod errors;
pub mod events;
pub mod exec;
pub mod job;
pub mod logging;
pub mod task;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::{ConfigFile, Workspace};
use crate::dag::Sequence;
use crate::engine::Scheduler;
use crate::events::EventTally;
use crate::job::Job;
use crate::task::FunctionRegistry;

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, instantiates its entities, submits the
/// requested sequences (or task), waits for the jobs and prints a summary.
pub fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;
    let registry = FunctionRegistry::with_builtins();
    let workspace = Workspace::build(&cfg, &registry)?;

    if args.dry_run {
        print_dry_run(&cfg, &workspace);
        return Ok(());
    }

    let scheduler = Scheduler::from_config(&cfg.core)?;
    let mut events = scheduler.notifier().register();

    let jobs = submit_requested(&scheduler, &workspace, &args)?;
    info!(jobs = jobs.len(), "submitted; waiting for jobs");

    let finished = scheduler.wait(&jobs, args.timeout.map(Duration::from_secs));

    let tally = EventTally::drain(&mut events);

    print_summary(&jobs, &workspace);
    print_events(&tally);
    scheduler.shutdown();

    if !finished {
        let open = jobs.iter().filter(|j| !j.is_finished()).count();
        bail!("timed out waiting for {open} job(s)");
    }
    let unsuccessful = jobs
        .iter()
        .filter(|j| j.is_failed() || j.is_cancelled())
        .count();
    if unsuccessful > 0 {
        bail!("{unsuccessful} job(s) failed or were cancelled");
    }
    Ok(())
}

fn submit_requested(
    scheduler: &Scheduler,
    workspace: &Workspace,
    args: &CliArgs,
) -> Result<Vec<Arc<Job>>> {
    if let Some(ref name) = args.task {
        let task = workspace.task(name)?;
        return Ok(vec![scheduler.submit_task(task, &[], args.force)?]);
    }

    if let Some(ref name) = args.sequence {
        let sequence = workspace.sequence(name)?;
        return Ok(scheduler.submit(sequence, &[], args.force)?);
    }

    let mut jobs = Vec::new();
    let mut sequences = workspace.sequences().peekable();
    if sequences.peek().is_none() {
        // No sequences configured: run every task as one.
        let all = Sequence::new("all", workspace.tasks().map(|(_, t)| Arc::clone(t)).collect());
        jobs.extend(scheduler.submit(&all, &[], args.force)?);
    } else {
        for (_, sequence) in sequences {
            jobs.extend(scheduler.submit(sequence, &[], args.force)?);
        }
    }
    Ok(jobs)
}

fn print_summary(jobs: &[Arc<Job>], workspace: &Workspace) {
    println!("jobs ({}):", jobs.len());
    for job in jobs {
        println!("  - {} {}", job.task().config_id(), job.status());
        for failure in job.failures() {
            println!("      error: {failure}");
        }
    }

    println!("data nodes:");
    for (name, dn) in workspace.data_nodes() {
        match dn.read() {
            Ok(value) => println!("  {name} = {value}"),
            Err(_) => println!("  {name} = <no data>"),
        }
    }
}

fn print_events(tally: &EventTally) {
    println!("events ({}):", tally.total());
    for ((entity_type, operation), count) in &tally.counts {
        println!("  {entity_type:?} {operation:?}: {count}");
    }
    if tally.dropped > 0 {
        println!("  ({} dropped)", tally.dropped);
    }
}

/// Print data nodes, tasks and the computed waves without executing.
fn print_dry_run(cfg: &ConfigFile, workspace: &Workspace) {
    println!("taskflow dry-run");
    println!("  core.mode = {:?}", cfg.core.mode);
    println!("  core.max_nb_of_workers = {}", cfg.core.max_nb_of_workers);
    println!();

    println!("data nodes ({}):", cfg.data_node.len());
    for (name, dn) in cfg.data_node.iter() {
        println!("  - {name}");
        if dn.cacheable {
            println!("      cacheable: true");
        }
        if let Some(ref validity) = dn.validity_period {
            println!("      validity_period: {validity}");
        }
        if let Some(ref default) = dn.default {
            println!("      default: {default}");
        }
    }

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        println!("      function: {}", task.function);
        if !task.inputs.is_empty() {
            println!("      inputs: {:?}", task.inputs);
        }
        if !task.outputs.is_empty() {
            println!("      outputs: {:?}", task.outputs);
        }
        if !task.effective_skippable() {
            println!("      skippable: false");
        }
    }

    println!("sequences ({}):", cfg.sequence.len());
    for (name, sequence) in workspace.sequences() {
        println!("  - {name} (consistent: {})", sequence.is_consistent());
        for (i, wave) in sequence.sorted_tasks().iter().enumerate() {
            let names: Vec<&str> = wave.iter().map(|t| t.config_id()).collect();
            println!("      wave {i}: {names:?}");
        }
    }

    debug!("dry-run complete (no execution)");
}
