// src/engine/mod.rs

//! Orchestration engine.
//!
//! [`Scheduler`] is the service object callers submit sequences and tasks
//! to. It owns the ready queue, the blocked list, the run lock and the
//! dispatcher reference; construct one per process and share it.

pub mod scheduler;

pub use scheduler::Scheduler;
