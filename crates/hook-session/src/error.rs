//! Error types for the hook session

use hook_graph::GraphError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::coordinator::SessionState;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Failures talking to an external store
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl PersistenceError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Errors surfaced by the session coordinator
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Nothing to save: configuration matches the persisted one")]
    NothingToSave,

    #[error("Cannot save while the graph contains a cycle")]
    CycleOutstanding,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SessionError {
    /// Whether this error reports a cycle in the hook graph
    pub fn is_cycle(&self) -> bool {
        match self {
            Self::Graph(e) => e.is_cycle(),
            Self::CycleOutstanding => true,
            _ => false,
        }
    }

    /// Whether this error came from an external store
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}
