//! Persistence collaborator contract.
//!
//! The detector rebuilds its graph from a repository at startup and mirrors
//! every mutation into it. Implementations must be callable from several
//! threads; the detector serialises calls under its own lock.

use crate::error::RagResult;
use crate::types::{Edge, Node};

/// Durable storage for nodes and edges
pub trait GraphRepository: Send + Sync {
    /// All stored nodes, in the order they were stored
    fn list_nodes(&self) -> RagResult<Vec<Node>>;

    /// All stored edges, in the order they were stored
    fn list_edges(&self) -> RagResult<Vec<Edge>>;

    /// Persist a newly created node
    fn insert_node(&self, node: &Node) -> RagResult<()>;

    /// Persist a newly created edge
    fn insert_edge(&self, edge: &Edge) -> RagResult<()>;

    /// Remove every node and edge
    fn delete_all(&self) -> RagResult<()>;
}

impl<R: GraphRepository + ?Sized> GraphRepository for std::sync::Arc<R> {
    fn list_nodes(&self) -> RagResult<Vec<Node>> {
        (**self).list_nodes()
    }

    fn list_edges(&self) -> RagResult<Vec<Edge>> {
        (**self).list_edges()
    }

    fn insert_node(&self, node: &Node) -> RagResult<()> {
        (**self).insert_node(node)
    }

    fn insert_edge(&self, edge: &Edge) -> RagResult<()> {
        (**self).insert_edge(edge)
    }

    fn delete_all(&self) -> RagResult<()> {
        (**self).delete_all()
    }
}
