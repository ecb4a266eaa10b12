//! In-memory repository
//!
//! Keeps rows in insertion order and never fails. Nothing is validated here;
//! the detector owns the graph rules.

use parking_lot::Mutex;
use rag_core::repository::GraphRepository;
use rag_core::types::{Edge, Node};

use crate::StoreResult;

#[derive(Debug, Default)]
struct Rows {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

/// Repository backed by process memory
#[derive(Debug, Default)]
pub struct MemoryRepository {
    rows: Mutex<Rows>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a repository with existing rows
    pub fn with_rows(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            rows: Mutex::new(Rows { nodes, edges }),
        }
    }

    pub fn node_count(&self) -> usize {
        self.rows.lock().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.rows.lock().edges.len()
    }
}

impl GraphRepository for MemoryRepository {
    fn list_nodes(&self) -> StoreResult<Vec<Node>> {
        Ok(self.rows.lock().nodes.clone())
    }

    fn list_edges(&self) -> StoreResult<Vec<Edge>> {
        Ok(self.rows.lock().edges.clone())
    }

    fn insert_node(&self, node: &Node) -> StoreResult<()> {
        self.rows.lock().nodes.push(node.clone());
        Ok(())
    }

    fn insert_edge(&self, edge: &Edge) -> StoreResult<()> {
        self.rows.lock().edges.push(edge.clone());
        Ok(())
    }

    fn delete_all(&self) -> StoreResult<()> {
        let mut rows = self.rows.lock();
        rows.nodes.clear();
        rows.edges.clear();
        Ok(())
    }
}
