//! Elementary cycle enumeration (Johnson's algorithm)
//!
//! Every elementary cycle of a snapshot is reported exactly once. The graph
//! is split into strongly connected components once; each component with a
//! cycle goes on a worklist. For a component, every cycle through its least
//! vertex `s` is found, then `s` is removed and only that component is split
//! again. Within a search a vertex stays blocked until a cycle is found
//! through it, so the work is bounded by the graph size times the number of
//! cycles reported, and disjoint components never revisit each other.
//!
//! Output is canonical: each cycle starts at its smallest id and the list is
//! sorted lexicographically.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use tracing::debug;

use rag_core::types::NodeId;

use crate::store::GraphSnapshot;

/// Default cap on the number of cycles collected by one detection
pub const DEFAULT_MAX_CYCLES: usize = 10_000;

/// How often (in search steps) the deadline is checked
const DEADLINE_CHECK_INTERVAL: u64 = 256;

/// Bounds on a single enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerationLimits {
    /// Maximum number of cycles to collect
    pub max_cycles: usize,
    /// Wall-clock budget for the search
    pub deadline: Option<Duration>,
}

/// An elementary cycle in canonical rotation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Cycle(Vec<NodeId>);

/// Outcome of an enumeration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    /// At least one elementary cycle exists. Accurate even when truncated.
    pub has_cycle: bool,
    /// Cycles found, canonical and sorted
    pub cycles: Vec<Cycle>,
    /// The search stopped early; `cycles` is a sample
    pub truncated: bool,
}

impl Default for EnumerationLimits {
    fn default() -> Self {
        Self {
            max_cycles: DEFAULT_MAX_CYCLES,
            deadline: None,
        }
    }
}

impl EnumerationLimits {
    /// No cap and no deadline
    pub fn unbounded() -> Self {
        Self {
            max_cycles: usize::MAX,
            deadline: None,
        }
    }

    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

impl Cycle {
    /// Build a cycle, rotating it to start at its smallest id
    pub fn new(mut nodes: Vec<NodeId>) -> Self {
        canonicalize(&mut nodes);
        Self(nodes)
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|node| node.as_str() == id)
    }
}

/// Format cycle as "a -> b -> c -> a"
impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.0.first() else {
            return f.write_str("No cycle");
        };

        for node in &self.0 {
            write!(f, "{} -> ", node)?;
        }
        write!(f, "{}", first)
    }
}

/// Rotate a cycle so it begins at its smallest element
pub fn canonicalize<T: Ord>(cycle: &mut [T]) {
    let start = cycle
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(position, _)| position)
        .unwrap_or(0);
    cycle.rotate_left(start);
}

/// Enumerate every elementary cycle of `snapshot` within `limits`
pub fn enumerate_cycles(snapshot: &GraphSnapshot, limits: &EnumerationLimits) -> Enumeration {
    let graph = IndexedGraph::from_snapshot(snapshot);
    if graph.edge_count == 0 {
        return Enumeration::default();
    }

    let deadline = limits.deadline.map(|budget| Instant::now() + budget);
    let mut search = CircuitSearch::new(&graph.adjacency, limits.max_cycles, deadline);

    let everything: Vec<usize> = (0..graph.len()).collect();
    let mut pending = graph.cyclic_components(&everything);
    let has_cycle = !pending.is_empty();

    while let Some(component) = pending.pop() {
        if search.past_deadline() {
            search.stopped = true;
            break;
        }

        let Some(&start) = component.iter().min() else {
            continue;
        };
        search.run(start, &component);
        if search.stopped {
            break;
        }

        let rest: Vec<usize> = component.into_iter().filter(|&v| v != start).collect();
        pending.extend(graph.cyclic_components(&rest));
    }

    let mut found = search.cycles;
    for cycle in &mut found {
        canonicalize(cycle);
    }
    found.sort();

    debug!(
        "Enumerated {} cycles over {} nodes (truncated: {})",
        found.len(),
        graph.len(),
        search.stopped
    );

    Enumeration {
        has_cycle,
        cycles: found
            .into_iter()
            .map(|cycle| Cycle(cycle.into_iter().map(|v| graph.ids[v].clone()).collect()))
            .collect(),
        truncated: search.stopped,
    }
}

/// Snapshot relabelled to dense indices in id order
struct IndexedGraph {
    ids: Vec<NodeId>,
    /// Sorted, de-duplicated successor lists
    adjacency: Vec<Vec<usize>>,
    edge_count: usize,
}

impl IndexedGraph {
    fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let mut ids: Vec<NodeId> = snapshot.nodes().map(|node| node.id.clone()).collect();
        ids.sort();

        let position: HashMap<&NodeId, usize> =
            ids.iter().enumerate().map(|(index, id)| (id, index)).collect();
        let mut adjacency = vec![Vec::new(); ids.len()];

        for edge in snapshot.edges() {
            if let (Some(&from), Some(&to)) = (position.get(&edge.source), position.get(&edge.target)) {
                adjacency[from].push(to);
            }
        }

        let mut edge_count = 0;
        for successors in &mut adjacency {
            successors.sort_unstable();
            successors.dedup();
            edge_count += successors.len();
        }

        Self {
            ids,
            adjacency,
            edge_count,
        }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    /// Strongly connected components of the subgraph induced by `vertices`
    /// that contain at least one cycle
    fn cyclic_components(&self, vertices: &[usize]) -> Vec<Vec<usize>> {
        let local: HashMap<usize, NodeIndex> = vertices
            .iter()
            .enumerate()
            .map(|(index, &v)| (v, NodeIndex::new(index)))
            .collect();

        let mut induced: DiGraph<usize, ()> = DiGraph::with_capacity(vertices.len(), 0);
        for &v in vertices {
            induced.add_node(v);
        }
        for (from, &v) in vertices.iter().enumerate() {
            for w in &self.adjacency[v] {
                if let Some(&to) = local.get(w) {
                    induced.add_edge(NodeIndex::new(from), to, ());
                }
            }
        }

        tarjan_scc(&induced)
            .into_iter()
            .map(|component| component.into_iter().map(|index| induced[index]).collect::<Vec<_>>())
            .filter(|component| self.is_cyclic(component))
            .collect()
    }

    /// A component holds a cycle if it has two vertices or a self-loop
    fn is_cyclic(&self, component: &[usize]) -> bool {
        match component {
            [] => false,
            [single] => self.adjacency[*single].binary_search(single).is_ok(),
            _ => true,
        }
    }
}

/// DFS frame: the vertex, the next successor to try, and whether a cycle
/// has been closed through this vertex
struct Frame {
    vertex: usize,
    next: usize,
    closed: bool,
}

impl Frame {
    fn new(vertex: usize) -> Self {
        Self {
            vertex,
            next: 0,
            closed: false,
        }
    }
}

/// Search state shared across start vertices
struct CircuitSearch<'g> {
    adjacency: &'g [Vec<usize>],
    in_component: Vec<bool>,
    blocked: Vec<bool>,
    /// B(v): vertices to unblock when v is unblocked
    blocked_by: Vec<Vec<usize>>,
    cycles: Vec<Vec<usize>>,
    max_cycles: usize,
    deadline: Option<Instant>,
    steps: u64,
    stopped: bool,
}

impl<'g> CircuitSearch<'g> {
    fn new(adjacency: &'g [Vec<usize>], max_cycles: usize, deadline: Option<Instant>) -> Self {
        let n = adjacency.len();
        Self {
            adjacency,
            in_component: vec![false; n],
            blocked: vec![false; n],
            blocked_by: vec![Vec::new(); n],
            cycles: Vec::new(),
            max_cycles,
            deadline,
            steps: 0,
            stopped: false,
        }
    }

    /// Find every cycle through `start` inside `component`
    fn run(&mut self, start: usize, component: &[usize]) {
        for &v in component {
            self.in_component[v] = true;
            self.blocked[v] = false;
            self.blocked_by[v].clear();
        }

        let adjacency = self.adjacency;
        let mut path = vec![start];
        let mut stack = vec![Frame::new(start)];
        self.blocked[start] = true;

        while let Some(frame) = stack.last_mut() {
            if self.out_of_time() {
                self.stopped = true;
                break;
            }

            let v = frame.vertex;
            match adjacency[v].get(frame.next).copied() {
                Some(w) => {
                    frame.next += 1;
                    if !self.in_component[w] {
                        continue;
                    }

                    if w == start {
                        frame.closed = true;
                        if self.cycles.len() >= self.max_cycles {
                            self.stopped = true;
                            break;
                        }
                        self.cycles.push(path.clone());
                    } else if !self.blocked[w] {
                        self.blocked[w] = true;
                        path.push(w);
                        stack.push(Frame::new(w));
                    }
                },
                None => {
                    let closed = frame.closed;
                    stack.pop();
                    path.pop();

                    if closed {
                        self.unblock(v);
                        if let Some(parent) = stack.last_mut() {
                            parent.closed = true;
                        }
                    } else {
                        for &w in &adjacency[v] {
                            if self.in_component[w] && !self.blocked_by[w].contains(&v) {
                                self.blocked_by[w].push(v);
                            }
                        }
                    }
                },
            }
        }

        for &v in component {
            self.in_component[v] = false;
        }
    }

    /// Unblock `vertex` and, transitively, everything waiting on it
    fn unblock(&mut self, vertex: usize) {
        let mut pending = vec![vertex];
        while let Some(v) = pending.pop() {
            if !self.blocked[v] {
                continue;
            }
            self.blocked[v] = false;
            pending.append(&mut self.blocked_by[v]);
        }
    }

    fn past_deadline(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn out_of_time(&mut self) -> bool {
        let Some(deadline) = self.deadline else {
            return false;
        };
        self.steps += 1;
        self.steps % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline
    }
}
