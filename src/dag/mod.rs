// src/dag/mod.rs

//! Task dependency graph.
//!
//! - [`graph`] builds the bipartite data node / task graph and sorts it into
//!   waves.
//! - [`sequence`] is the task collection submitted as one unit.

pub mod graph;
pub mod sequence;

pub use graph::{GraphNode, TaskGraph};
pub use sequence::Sequence;
