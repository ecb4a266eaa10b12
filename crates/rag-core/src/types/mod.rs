//! Core data types for the resource-allocation graph.
//!
//! This module provides the fundamental types used throughout rag:
//! - Node identifiers and the closed set of node kinds
//! - Directed edges and the relation they encode

pub mod edge;
pub mod node;

// Re-export all public types
pub use edge::{Edge, EdgeRelation};
pub use node::{Node, NodeId, NodeKind};
