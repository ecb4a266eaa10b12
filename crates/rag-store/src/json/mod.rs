//! JSON file repository
//!
//! The whole graph lives in one document:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "saved_at": "2024-05-01T12:00:00Z",
//!   "nodes": [{ "id": "P1", "kind": "process" }],
//!   "edges": [{ "source": "P1", "target": "R1" }]
//! }
//! ```
//!
//! Every write replaces the file through a temporary sibling and a rename,
//! so readers see either the old or the new document.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rag_core::error::RagError;
use rag_core::repository::GraphRepository;
use rag_core::types::{Edge, Node};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{debug, info};

use crate::StoreResult;

/// Document layout version written by this crate
pub const FORMAT_VERSION: u32 = 1;

/// On-disk graph document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredGraph {
    pub format_version: u32,
    /// Time of the last successful write
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Default for StoredGraph {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            saved_at: None,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

/// Repository persisting the graph to a single JSON file
#[derive(Debug)]
pub struct JsonFileRepository {
    path: Utf8PathBuf,
    document: Mutex<StoredGraph>,
}

impl JsonFileRepository {
    /// Load the document at `path`, or start empty if it does not exist yet
    pub fn open<P: AsRef<Utf8Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let document = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                RagError::persistence_with(format!("Failed to read graph file {}", path), e)
            })?;
            let document: StoredGraph = serde_json::from_str(&content).map_err(|e| {
                RagError::persistence_with(format!("Graph file {} is malformed", path), e)
            })?;
            if document.format_version != FORMAT_VERSION {
                return Err(RagError::persistence(format!(
                    "Graph file {} has unsupported format version {} (expected {})",
                    path, document.format_version, FORMAT_VERSION
                )));
            }
            info!(
                "Opened graph file {} ({} nodes, {} edges)",
                path,
                document.nodes.len(),
                document.edges.len()
            );
            document
        } else {
            debug!("Graph file {} not found, starting empty", path);
            StoredGraph::default()
        };

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Copy of the current document
    pub fn document(&self) -> StoredGraph {
        self.document.lock().clone()
    }

    /// Apply `change` and write the result; the in-memory document is left
    /// untouched if the write fails.
    fn update<F>(&self, change: F) -> StoreResult<()>
    where
        F: FnOnce(&mut StoredGraph),
    {
        let mut document = self.document.lock();
        let mut next = document.clone();
        change(&mut next);
        next.saved_at = Some(Utc::now());

        self.write(&next)?;
        *document = next;
        Ok(())
    }

    fn write(&self, document: &StoredGraph) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(document)
            .map_err(|e| RagError::persistence_with("Failed to serialize graph", e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    RagError::persistence_with(format!("Failed to create directory {}", parent), e)
                })?;
            }
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, content).map_err(|e| {
            RagError::persistence_with(format!("Failed to write {}", temp_path), e)
        })?;
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(RagError::persistence_with(
                format!("Failed to replace graph file {}", self.path),
                e,
            ));
        }

        debug!(
            "Wrote {} nodes and {} edges to {}",
            document.nodes.len(),
            document.edges.len(),
            self.path
        );
        Ok(())
    }

    fn temp_path(&self) -> Utf8PathBuf {
        let file_name = self.path.file_name().unwrap_or("graph.json");
        self.path.with_file_name(format!(".{}.tmp", file_name))
    }
}

impl GraphRepository for JsonFileRepository {
    fn list_nodes(&self) -> StoreResult<Vec<Node>> {
        Ok(self.document.lock().nodes.clone())
    }

    fn list_edges(&self) -> StoreResult<Vec<Edge>> {
        Ok(self.document.lock().edges.clone())
    }

    fn insert_node(&self, node: &Node) -> StoreResult<()> {
        self.update(|document| document.nodes.push(node.clone()))
    }

    fn insert_edge(&self, edge: &Edge) -> StoreResult<()> {
        self.update(|document| document.edges.push(edge.clone()))
    }

    fn delete_all(&self) -> StoreResult<()> {
        self.update(|document| {
            document.nodes.clear();
            document.edges.clear();
        })
    }
}
