//! # rag-core
//!
//! Core types and utilities shared across all rag crates.
//!
//! This crate provides:
//! - `NodeId`, `NodeKind`, `Node` and `Edge` for the resource-allocation graph
//! - `RagError` enum for unified error handling
//! - `GraphRepository`, the contract every durable store implements
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Graph data types (nodes, edges, relations)
//! - `error`: Error types and result aliases
//! - `repository`: Persistence collaborator interface

pub mod error;
pub mod repository;
pub mod types;

// Re-export commonly used types
pub use error::{RagError, RagResult};
pub use repository::GraphRepository;
pub use types::{Edge, EdgeRelation, Node, NodeId, NodeKind};
