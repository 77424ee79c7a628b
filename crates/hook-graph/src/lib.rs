//! Hook Graph - port-aware graph of hooks wired around a service call
//!
//! This crate holds the pure core of the hook editor. It supports:
//!
//! - A port model with per-method service ports and generic unit ports
//! - Structural edits that keep port arity consistent (connect,
//!   disconnect, delete-with-rewire)
//! - Before/after chain resolution with cycle detection
//! - Change detection between resolved configurations
//! - Compressed snapshot-based undo/redo
//!
//! Nothing here performs I/O; persistence and scheduling live in
//! `hook-session`.
//!
//! # Example
//!
//! ```
//! use hook_graph::{resolve, ChainSide, GraphBuilder};
//!
//! let store = GraphBuilder::new()
//!     .unit("a", "auth")
//!     .unit("b", "rate-limit")
//!     .before("GET", "a")
//!     .link("b", "a")
//!     .build()
//!     .unwrap();
//!
//! let config = resolve(&store).unwrap();
//! assert_eq!(config.chain(ChainSide::Before, "GET"), ["rate-limit", "auth"]);
//! ```

pub mod builder;
pub mod chain;
pub mod diff;
pub mod error;
pub mod ports;
pub mod resolver;
pub mod store;
pub mod types;
pub mod undo;
pub mod validation;

// Re-export key types
pub use builder::GraphBuilder;
pub use chain::HookChainConfig;
pub use diff::{diff, differs, ChainDiff};
pub use error::{GraphError, Result};
pub use ports::{
    after_port, before_port, ChainSide, PortDirection, PortPolicy, PortSpec, UNIT_INPUT,
    UNIT_OUTPUT,
};
pub use resolver::{resolve, resolve_after, resolve_before, Ancestors, ChainStep, Descendants};
pub use store::GraphStore;
pub use types::{
    EdgeId, EditorState, GraphChange, GraphEdge, GraphNode, HookTypeId, MethodSet, NodeId,
    NodeKind, PortName, PortRef, Viewport, SERVICE_NODE_ID,
};
pub use undo::UndoStack;
pub use validation::{validate_state, ValidationError};
