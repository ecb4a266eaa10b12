//! Edge types.
//!
//! Edges carry no tag of their own; whether an edge is a request or an
//! allocation follows from the kind of its source node.

use super::{NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

/// Meaning of an edge, derived from its endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeRelation {
    /// Process -> Resource: the process waits for the resource
    Request,
    /// Resource -> Process: the resource is held by the process
    Allocation,
}

impl Edge {
    /// Create a new edge
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Edge recording that `process` waits for `resource`
    pub fn request(process: impl Into<NodeId>, resource: impl Into<NodeId>) -> Self {
        Self::new(process, resource)
    }

    /// Edge recording that `resource` is held by `process`
    pub fn allocation(process: impl Into<NodeId>, resource: impl Into<NodeId>) -> Self {
        Self::new(resource, process)
    }

    /// Whether both endpoints are the same node
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

impl EdgeRelation {
    /// Relation of an edge leaving a node of the given kind
    pub fn from_source_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Process => EdgeRelation::Request,
            NodeKind::Resource => EdgeRelation::Allocation,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeRelation::Request => "request",
            EdgeRelation::Allocation => "allocation",
        }
    }
}

impl fmt::Display for EdgeRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
