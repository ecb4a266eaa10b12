//! Resource-allocation graph storage using petgraph
//!
//! Holds typed nodes and a directed edge set. Node ids are unique across the
//! whole namespace and every edge endpoint must already exist. The store does
//! no locking of its own; the detector owns it behind a mutex.

use std::collections::{BTreeSet, HashMap};

use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use rag_core::error::RagError;
use rag_core::types::{Edge, EdgeRelation, Node, NodeId, NodeKind};

use crate::GraphResult;

/// Directed graph of processes and resources
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    /// Underlying directed graph, edges carry no weight
    graph: DiGraph<Node, ()>,
    /// Map from NodeId to NodeIndex for fast lookups
    node_map: HashMap<NodeId, NodeIndex>,
}

/// Immutable copy of the graph taken under the detector lock
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    graph: DiGraph<Node, ()>,
}

/// Read-only listing of the graph for presentation layers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphStore {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; fails if the id is taken by any node of either kind
    pub fn add_node(&mut self, id: NodeId, kind: NodeKind) -> GraphResult<()> {
        if self.node_map.contains_key(&id) {
            return Err(RagError::DuplicateNode { id: id.into_inner() });
        }

        let index = self.graph.add_node(Node {
            id: id.clone(),
            kind,
        });
        self.node_map.insert(id, index);
        Ok(())
    }

    /// Add a directed edge between two existing nodes.
    ///
    /// Returns `Ok(false)` when the edge was already present, leaving the
    /// graph untouched.
    pub fn add_edge(&mut self, source: &str, target: &str) -> GraphResult<bool> {
        let from = self.index_of(source)?;
        let to = self.index_of(target)?;

        if self.graph.contains_edge(from, to) {
            return Ok(false);
        }

        self.graph.add_edge(from, to, ());
        Ok(true)
    }

    /// Check whether a node with this id exists
    pub fn has_node(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    /// Kind of the node with this id
    pub fn node_kind(&self, id: &str) -> Option<NodeKind> {
        let index = self.node_map.get(id)?;
        self.graph.node_weight(*index).map(|node| node.kind)
    }

    /// Outgoing neighbours of a node, sorted. Unknown ids have none.
    pub fn neighbors(&self, id: &str) -> BTreeSet<NodeId> {
        match self.node_map.get(id) {
            Some(index) => self
                .graph
                .neighbors(*index)
                .map(|neighbor| self.graph[neighbor].id.clone())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Get number of nodes in the graph
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get number of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Remove every node and edge
    pub fn clear(&mut self) {
        self.graph.clear();
        self.node_map.clear();
    }

    /// Copy the current state for lock-free traversal
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            graph: self.graph.clone(),
        }
    }

    /// Replace the current state with a snapshot taken earlier
    pub(crate) fn restore(&mut self, snapshot: GraphSnapshot) {
        self.graph = snapshot.graph;
        self.node_map = self
            .graph
            .node_indices()
            .map(|index| (self.graph[index].id.clone(), index))
            .collect();
    }

    /// Undo an `add_node`. Incident edges go with the node.
    pub(crate) fn remove_node(&mut self, id: &str) -> Option<Node> {
        let index = self.node_map.remove(id)?;
        let removed = self.graph.remove_node(index)?;

        // petgraph moves the last node into the freed slot
        if let Some(moved) = self.graph.node_weight(index) {
            self.node_map.insert(moved.id.clone(), index);
        }

        Some(removed)
    }

    /// Undo an `add_edge` that returned `Ok(true)`
    pub(crate) fn remove_edge(&mut self, source: &str, target: &str) -> bool {
        let (Some(from), Some(to)) = (self.node_map.get(source), self.node_map.get(target)) else {
            return false;
        };

        match self.graph.find_edge(*from, *to) {
            Some(edge) => self.graph.remove_edge(edge).is_some(),
            None => false,
        }
    }

    fn index_of(&self, id: &str) -> GraphResult<NodeIndex> {
        self.node_map
            .get(id)
            .copied()
            .ok_or_else(|| RagError::UnknownNode { id: id.to_string() })
    }
}

impl GraphSnapshot {
    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edge_references().map(|edge| {
            Edge::new(
                self.graph[edge.source()].id.clone(),
                self.graph[edge.target()].id.clone(),
            )
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Node and edge listing for presentation
    pub fn view(&self) -> GraphView {
        GraphView {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().collect(),
        }
    }

    /// Render as Graphviz DOT: processes as ellipses, resources as boxes,
    /// edges labelled with the relation they encode.
    pub fn to_dot(&self) -> String {
        let labelled = self.graph.map(
            |_, node| node.clone(),
            |edge, _| {
                self.graph
                    .edge_endpoints(edge)
                    .map(|(source, _)| EdgeRelation::from_source_kind(self.graph[source].kind))
                    .unwrap_or(EdgeRelation::Request)
            },
        );

        let dot = Dot::with_attr_getters(
            &labelled,
            &[],
            &|_, _| String::new(),
            &|_, (_, node)| match node.kind {
                NodeKind::Process => "shape = ellipse".to_string(),
                NodeKind::Resource => "shape = box".to_string(),
            },
        );
        format!("{}", dot)
    }
}

impl GraphView {
    /// Each edge paired with the relation its source kind implies
    pub fn relations(&self) -> Vec<(&Edge, EdgeRelation)> {
        let kinds: HashMap<&NodeId, NodeKind> =
            self.nodes.iter().map(|node| (&node.id, node.kind)).collect();

        self.edges
            .iter()
            .filter_map(|edge| {
                kinds
                    .get(&edge.source)
                    .map(|kind| (edge, EdgeRelation::from_source_kind(*kind)))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}
