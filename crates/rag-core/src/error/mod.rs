//! Error types and result aliases for rag operations.
//!
//! Provides a unified error type that covers every failure the graph store,
//! the detector and their collaborators can report, with actionable messages.

use crate::types::NodeKind;
use thiserror::Error;

/// Unified error type for all rag operations
#[derive(Error, Debug)]
pub enum RagError {
    // Graph errors
    #[error("Node '{id}' already exists")]
    DuplicateNode { id: String },

    #[error("Node '{id}' not found")]
    UnknownNode { id: String },

    #[error("Node '{id}' is not a {expected}")]
    InvalidKind { id: String, expected: NodeKind },

    #[error("Node '{id}' cannot request or hold itself")]
    SelfReference { id: String },

    // Storage errors
    #[error("Persistence failure: {message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Config errors
    #[error("Failed to parse rag.toml: {message} at line {line}, column {column}")]
    ConfigParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for rag operations
pub type RagResult<T> = Result<T, RagError>;

impl RagError {
    /// Create a persistence error without an underlying cause
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// Create a persistence error wrapping the collaborator's failure
    pub fn persistence_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Persistence {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Check if retrying the same call may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RagError::Persistence { .. } | RagError::Io { .. })
    }

    /// Id of the node the error is about, if any
    pub fn node_id(&self) -> Option<&str> {
        match self {
            RagError::DuplicateNode { id }
            | RagError::UnknownNode { id }
            | RagError::InvalidKind { id, .. }
            | RagError::SelfReference { id } => Some(id),
            _ => None,
        }
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            RagError::DuplicateNode { .. } => {
                Some("Identifiers are shared by processes and resources; pick an unused id")
            },
            RagError::UnknownNode { .. } => {
                Some("Add the process or resource first, or check the id spelling")
            },
            RagError::InvalidKind { .. } => {
                Some("Pass the process id first and the resource id second")
            },
            RagError::SelfReference { .. } => Some("Use two different ids"),
            RagError::Persistence { .. } => {
                Some("The graph was left unchanged; check the store and try again")
            },
            RagError::ConfigParse { .. } | RagError::ConfigValidation { .. } => {
                Some("Fix rag.toml or the RAG_* environment variables")
            },
            RagError::Io { .. } => None,
        }
    }
}
