//! Node types.
//!
//! A node is either a process or a resource. Identifiers share one namespace,
//! so a process and a resource can never carry the same id.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque, namespace-wide unique node identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

/// Kind of a node in the allocation graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A process that requests and holds resources
    Process,
    /// A single-instance resource
    Resource,
}

/// A typed node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl NodeId {
    /// Create a new node id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the id, returning the owned string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl NodeKind {
    /// Lowercase name used in messages and on disk
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Process => "process",
            NodeKind::Resource => "resource",
        }
    }

    /// Title-case label used in user-facing messages
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Process => "Process",
            NodeKind::Resource => "Resource",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Node {
    /// Create a new node
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    /// Create a process node
    pub fn process(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Process)
    }

    /// Create a resource node
    pub fn resource(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Resource)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
