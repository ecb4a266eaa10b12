//! Graph repositories for rag
//!
//! This crate provides the durable side of the detector: an in-memory
//! repository for tests and ephemeral sessions, and a JSON document on disk
//! that the CLI uses between invocations.

pub mod json;
pub mod memory;

// Re-export main types
pub use json::{JsonFileRepository, StoredGraph, FORMAT_VERSION};
pub use memory::MemoryRepository;

use rag_core::error::RagError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, RagError>;
