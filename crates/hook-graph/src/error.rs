//! Error types for the hook graph

use thiserror::Error;

use crate::validation::ValidationError;

/// Result type alias using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while editing or resolving a hook graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// Connect attempted on a nonexistent or malformed port
    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    /// Disallowed structural edit (e.g. deleting the service node)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A node or edge id does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Chain resolution revisited part of the graph
    #[error("Cycle detected in the '{method}' chain at node '{node}'")]
    CycleDetected { method: String, node: String },

    /// Persisted records failed validation
    #[error("Invalid graph: {}", summarize(.0))]
    InvalidGraph(Vec<ValidationError>),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),
}

impl GraphError {
    /// Create an invalid connection error with a message
    pub fn invalid_connection(msg: impl Into<String>) -> Self {
        Self::InvalidConnection(msg.into())
    }

    /// Create an invalid operation error with a message
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Create a not found error with a message
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Whether this error came from chain resolution rather than an edit
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::CycleDetected { .. })
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
