// src/dag/graph.rs

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::Direction;
use petgraph::algo::{connected_components, is_cyclic_directed};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::task::Task;
use crate::types::DataNodeId;

fn data_index(
    graph: &mut DiGraph<GraphNode, ()>,
    known: &mut HashMap<DataNodeId, NodeIndex>,
    id: &DataNodeId,
) -> NodeIndex {
    *known
        .entry(id.clone())
        .or_insert_with(|| graph.add_node(GraphNode::Data(id.clone())))
}

/// Node of the bipartite dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphNode {
    Data(DataNodeId),
    /// Position of the task in the list the graph was built from.
    Task(usize),
}

impl GraphNode {
    pub fn is_task(&self) -> bool {
        matches!(self, GraphNode::Task(_))
    }
}

/// Dependency graph over tasks and data nodes.
///
/// Edge direction: input data node -> task -> output data node.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    graph: DiGraph<GraphNode, ()>,
}

impl TaskGraph {
    pub fn build(tasks: &[Arc<Task>]) -> Self {
        let mut graph = DiGraph::new();
        let mut data_nodes: HashMap<DataNodeId, NodeIndex> = HashMap::new();

        for (position, task) in tasks.iter().enumerate() {
            let t = graph.add_node(GraphNode::Task(position));
            for dn in task.inputs() {
                let d = data_index(&mut graph, &mut data_nodes, dn.id());
                graph.update_edge(d, t, ());
            }
            for dn in task.outputs() {
                let d = data_index(&mut graph, &mut data_nodes, dn.id());
                graph.update_edge(t, d, ());
            }
        }

        Self { graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Connected, acyclic, and alternating between data nodes and tasks.
    ///
    /// The empty graph is consistent.
    pub fn is_consistent(&self) -> bool {
        if self.graph.node_count() == 0 {
            return true;
        }
        if is_cyclic_directed(&self.graph) {
            return false;
        }
        if connected_components(&self.graph) != 1 {
            return false;
        }
        self.edges_alternate() && self.layers_alternate()
    }

    fn edges_alternate(&self) -> bool {
        self.graph.edge_indices().all(|e| {
            self.graph
                .edge_endpoints(e)
                .is_some_and(|(a, b)| self.graph[a].is_task() != self.graph[b].is_task())
        })
    }

    /// With source data nodes set aside, even layers hold only tasks and
    /// odd layers only data nodes.
    fn layers_alternate(&self) -> bool {
        self.layers_without_sources()
            .iter()
            .enumerate()
            .all(|(depth, layer)| {
                layer
                    .iter()
                    .all(|&n| self.graph[n].is_task() == (depth % 2 == 0))
            })
    }

    /// Waves of task positions. Tasks inside a wave are in build order.
    ///
    /// Nodes on a cycle never become free and are left out.
    pub fn task_waves(&self) -> Vec<Vec<usize>> {
        self.layers_without_sources()
            .into_iter()
            .map(|layer| {
                layer
                    .into_iter()
                    .filter_map(|n| match self.graph[n] {
                        GraphNode::Task(position) => Some(position),
                        GraphNode::Data(_) => None,
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|wave| !wave.is_empty())
            .collect()
    }

    fn is_source_data(&self, n: NodeIndex) -> bool {
        !self.graph[n].is_task()
            && self
                .graph
                .neighbors_directed(n, Direction::Incoming)
                .next()
                .is_none()
    }

    /// Kahn generations over the graph minus its source data nodes.
    fn layers_without_sources(&self) -> Vec<Vec<NodeIndex>> {
        let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
        for n in self.graph.node_indices() {
            if self.is_source_data(n) {
                continue;
            }
            let degree = self
                .graph
                .neighbors_directed(n, Direction::Incoming)
                .filter(|&p| !self.is_source_data(p))
                .count();
            in_degree.insert(n, degree);
        }

        let mut current: Vec<NodeIndex> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(n, _)| *n)
            .collect();
        current.sort_by_key(|n| self.order_key(*n));

        let mut layers = Vec::new();
        while !current.is_empty() {
            let mut next = Vec::new();
            for &n in &current {
                for succ in self.graph.neighbors_directed(n, Direction::Outgoing) {
                    if let Some(degree) = in_degree.get_mut(&succ) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(succ);
                        }
                    }
                }
            }
            next.sort_by_key(|n| self.order_key(*n));
            next.dedup();
            layers.push(current);
            current = next;
        }
        layers
    }

    /// Tasks by build position, data nodes after them by insertion index.
    fn order_key(&self, n: NodeIndex) -> (usize, usize) {
        match self.graph[n] {
            GraphNode::Task(position) => (0, position),
            GraphNode::Data(_) => (1, n.index()),
        }
    }
}
