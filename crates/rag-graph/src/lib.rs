//! Deadlock detection engine for rag
//!
//! This crate holds the resource-allocation graph, the lock-guarded detector
//! that mutates it, and Johnson's elementary-circuit enumeration used to report
//! every cycle responsible for a deadlock.

pub mod cycles;
pub mod detector;
pub mod store;

// Re-export main types
pub use cycles::{Cycle, Enumeration, EnumerationLimits};
pub use detector::{DeadlockDetector, DetectionResult};
pub use store::{GraphSnapshot, GraphStore, GraphView};

use rag_core::error::RagError;

/// Result type for graph operations
pub type GraphResult<T> = Result<T, RagError>;
