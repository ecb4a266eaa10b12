//! Deadlock detector
//!
//! Owns the graph store behind a single exclusive lock and exposes the
//! mutation and query surface. Requests become process -> resource edges,
//! allocations become resource -> process edges. When a repository is
//! attached, every mutation is mirrored into it while the lock is held and
//! rolled back in memory if the durable write fails.
//!
//! Detection copies the graph under the lock and enumerates cycles after
//! releasing it, so a long search never blocks writers. The result reflects
//! a state that existed at some point during the call.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use rag_core::error::{RagError, RagResult};
use rag_core::repository::GraphRepository;
use rag_core::types::{Edge, EdgeRelation, Node, NodeKind};

use crate::cycles::{self, Cycle, Enumeration, EnumerationLimits};
use crate::store::{GraphSnapshot, GraphStore, GraphView};
use crate::GraphResult;


/// Result of a deadlock check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    /// True iff the graph holds at least one cycle
    pub has_deadlock: bool,
    /// Canonical, sorted elementary cycles
    pub cycles: Vec<Cycle>,
    /// Enumeration hit its cap or deadline; `cycles` is incomplete
    pub truncated: bool,
}

/// Lock-guarded resource-allocation graph with deadlock detection
pub struct DeadlockDetector {
    store: Mutex<GraphStore>,
    repository: Option<Arc<dyn GraphRepository>>,
    limits: EnumerationLimits,
}

impl DeadlockDetector {
    /// Create a detector with no durable store
    pub fn new() -> Self {
        Self {
            store: Mutex::new(GraphStore::new()),
            repository: None,
            limits: EnumerationLimits::default(),
        }
    }

    /// Rebuild the graph from `repository` and keep it in sync from now on
    pub fn open(repository: Arc<dyn GraphRepository>) -> GraphResult<Self> {
        let nodes = repository.list_nodes().map_err(into_persistence)?;
        let edges = repository.list_edges().map_err(into_persistence)?;

        let mut store = GraphStore::new();
        for node in nodes {
            store.add_node(node.id, node.kind).map_err(corrupt)?;
        }
        for edge in &edges {
            rehydrate_edge(&mut store, edge).map_err(corrupt)?;
        }

        info!(
            "Loaded {} nodes and {} edges from store",
            store.node_count(),
            store.edge_count()
        );

        Ok(Self {
            store: Mutex::new(store),
            repository: Some(repository),
            limits: EnumerationLimits::default(),
        })
    }

    /// Replace the default enumeration limits
    pub fn with_limits(mut self, limits: EnumerationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &EnumerationLimits {
        &self.limits
    }

    /// Register a process
    pub fn add_process(&self, id: &str) -> GraphResult<()> {
        self.add_node(Node::process(id))
    }

    /// Register a resource
    pub fn add_resource(&self, id: &str) -> GraphResult<()> {
        self.add_node(Node::resource(id))
    }

    /// Record that `process_id` waits for `resource_id`
    pub fn request_resource(&self, process_id: &str, resource_id: &str) -> GraphResult<()> {
        self.link(process_id, resource_id, EdgeRelation::Request)
    }

    /// Record that `resource_id` is held by `process_id`
    pub fn allocate_resource(&self, process_id: &str, resource_id: &str) -> GraphResult<()> {
        self.link(process_id, resource_id, EdgeRelation::Allocation)
    }

    /// Check for deadlock with the configured limits
    pub fn detect_deadlock(&self) -> DetectionResult {
        self.detect_deadlock_with(&self.limits)
    }

    /// Check for deadlock with caller-supplied limits
    pub fn detect_deadlock_with(&self, limits: &EnumerationLimits) -> DetectionResult {
        let snapshot = self.snapshot();
        let result = DetectionResult::from(cycles::enumerate_cycles(&snapshot, limits));

        if result.truncated {
            warn!(
                "Cycle enumeration stopped early after {} cycles (cap {})",
                result.cycles.len(),
                limits.max_cycles
            );
        }
        info!(
            "Deadlock check over {} nodes: deadlock={}, cycles={}",
            snapshot.node_count(),
            result.has_deadlock,
            result.cycles.len()
        );

        result
    }

    /// Copy of the current graph
    pub fn snapshot(&self) -> GraphSnapshot {
        self.store.lock().snapshot()
    }

    /// Node and edge listing for presentation
    pub fn graph_view(&self) -> GraphView {
        self.snapshot().view()
    }

    /// Empty the graph, in memory and in the durable store
    pub fn reset(&self) -> GraphResult<()> {
        let mut store = self.store.lock();
        let previous = store.snapshot();
        store.clear();

        if let Err(err) = self.persist(|repository| repository.delete_all()) {
            store.restore(previous);
            warn!("Reset rolled back: {}", err);
            return Err(err);
        }

        info!("Graph cleared");
        Ok(())
    }

    fn add_node(&self, node: Node) -> GraphResult<()> {
        let mut store = self.store.lock();
        store.add_node(node.id.clone(), node.kind)?;

        if let Err(err) = self.persist(|repository| repository.insert_node(&node)) {
            store.remove_node(node.id.as_str());
            warn!("Rolled back {} {}: {}", node.kind, node.id, err);
            return Err(err);
        }

        debug!("Added {} {}", node.kind, node.id);
        Ok(())
    }

    fn link(&self, process_id: &str, resource_id: &str, relation: EdgeRelation) -> GraphResult<()> {
        if process_id == resource_id {
            return Err(RagError::SelfReference {
                id: process_id.to_string(),
            });
        }

        let mut store = self.store.lock();
        ensure_exists(&store, process_id)?;
        ensure_exists(&store, resource_id)?;
        ensure_kind(&store, process_id, NodeKind::Process)?;
        ensure_kind(&store, resource_id, NodeKind::Resource)?;

        let edge = match relation {
            EdgeRelation::Request => Edge::request(process_id, resource_id),
            EdgeRelation::Allocation => Edge::allocation(process_id, resource_id),
        };

        if !store.add_edge(edge.source.as_str(), edge.target.as_str())? {
            debug!("Edge {} already present", edge);
            return Ok(());
        }

        if let Err(err) = self.persist(|repository| repository.insert_edge(&edge)) {
            store.remove_edge(edge.source.as_str(), edge.target.as_str());
            warn!("Rolled back {} {}: {}", relation, edge, err);
            return Err(err);
        }

        debug!("Added {} {}", relation, edge);
        Ok(())
    }

    fn persist<F>(&self, write: F) -> GraphResult<()>
    where
        F: FnOnce(&dyn GraphRepository) -> RagResult<()>,
    {
        match &self.repository {
            Some(repository) => write(repository.as_ref()).map_err(into_persistence),
            None => Ok(()),
        }
    }
}

impl Default for DeadlockDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeadlockDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.store.lock();
        f.debug_struct("DeadlockDetector")
            .field("nodes", &store.node_count())
            .field("edges", &store.edge_count())
            .field("persistent", &self.repository.is_some())
            .field("limits", &self.limits)
            .finish()
    }
}

impl From<Enumeration> for DetectionResult {
    fn from(enumeration: Enumeration) -> Self {
        Self {
            has_deadlock: enumeration.has_cycle,
            cycles: enumeration.cycles,
            truncated: enumeration.truncated,
        }
    }
}

fn ensure_exists(store: &GraphStore, id: &str) -> GraphResult<()> {
    if store.has_node(id) {
        Ok(())
    } else {
        Err(RagError::UnknownNode { id: id.to_string() })
    }
}

fn ensure_kind(store: &GraphStore, id: &str, expected: NodeKind) -> GraphResult<()> {
    match store.node_kind(id) {
        Some(kind) if kind == expected => Ok(()),
        Some(_) => Err(RagError::InvalidKind {
            id: id.to_string(),
            expected,
        }),
        None => Err(RagError::UnknownNode { id: id.to_string() }),
    }
}

/// Stored edges must join a process and a resource
fn rehydrate_edge(store: &mut GraphStore, edge: &Edge) -> GraphResult<()> {
    if edge.is_self_loop() {
        return Err(RagError::SelfReference {
            id: edge.source.to_string(),
        });
    }

    ensure_exists(store, edge.source.as_str())?;
    ensure_exists(store, edge.target.as_str())?;
    if store.node_kind(edge.source.as_str()) == store.node_kind(edge.target.as_str()) {
        let expected = match store.node_kind(edge.source.as_str()) {
            Some(NodeKind::Process) => NodeKind::Resource,
            _ => NodeKind::Process,
        };
        return Err(RagError::InvalidKind {
            id: edge.target.to_string(),
            expected,
        });
    }

    store.add_edge(edge.source.as_str(), edge.target.as_str())?;
    Ok(())
}

/// Repository failures always reach callers as `Persistence`
fn into_persistence(err: RagError) -> RagError {
    match err {
        RagError::Persistence { .. } => err,
        other => RagError::persistence_with("store operation failed", other),
    }
}

fn corrupt(err: RagError) -> RagError {
    RagError::persistence_with("stored graph is inconsistent", err)
}
