//! Hook Session - editing sessions over a hook graph
//!
//! Wraps the pure `hook-graph` core with everything that touches the
//! outside world:
//!
//! - [`SessionCoordinator`]: the `Loading -> Idle -> Dirty <-> Saving`
//!   state machine that re-resolves chains after every edit
//! - Persistence contracts ([`EditorStateStore`], [`HookConfigStore`]) with
//!   in-memory and JSON-file stores
//! - [`LayoutSaver`]: debounced saving of node positions and viewport
//! - [`SessionConfig`]: settings loaded from `hookwire.json`
//! - [`SessionEvent`]s published through an [`EventSink`]

pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod events;
pub mod persistence;

// Re-export key types
pub use config::{ConfigError, SessionConfig, CONFIG_FILE};
pub use coordinator::{CycleReport, SessionCoordinator, SessionState};
pub use debounce::LayoutSaver;
pub use error::{PersistenceError, Result, SessionError};
pub use events::{
    ChannelEventSink, EventError, EventSink, NullEventSink, SessionEvent, VecEventSink,
};
pub use persistence::{
    EditorStateStore, HookConfigStore, JsonFileStore, MemoryStore, EDITOR_STATE_FILE,
    HOOK_CONFIG_FILE,
};
