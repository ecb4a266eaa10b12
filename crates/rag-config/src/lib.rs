//! Configuration parsing for rag
//!
//! This crate handles parsing and validation of rag.toml and layers it with
//! the global config file, `RAG_*` environment variables and command-line
//! flags into one resolved configuration.

pub mod merge;
pub mod toml;

// Re-export main types
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource, RagConfig};
pub use toml::{DetectionSection, LogFormat, LogSection, RagToml, StoreBackend, StoreSection};

use rag_core::error::RagError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, RagError>;
