//! Session events
//!
//! The coordinator publishes every graph change, state transition and
//! persistence outcome to an [`EventSink`], so a UI (or a test) can follow
//! the session without polling it.

use hook_graph::GraphChange;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::coordinator::SessionState;

/// Trait for receiving session events
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g., channel closed)
    fn send(&self, event: SessionEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted by a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// The coordinator moved between states
    StateChanged { from: SessionState, to: SessionState },

    /// The graph was edited
    GraphChanged { change: GraphChange },

    /// Resolution succeeded; `changed` lists the chains that differ from
    /// the persisted configuration as `side:METHOD`
    ConfigResolved { changed: Vec<String> },

    /// Resolution hit a cycle; the last good configuration is kept
    CycleDetected { method: String, node: String },

    /// A previously reported cycle no longer exists
    CycleCleared,

    /// Loading from the store failed
    LoadFailed { error: String },

    /// The hook configuration was persisted
    ConfigSaved,

    /// Persisting the hook configuration failed
    SaveFailed { error: String },

    /// The editor layout was persisted
    LayoutSaved,

    /// Persisting the editor layout failed
    LayoutSaveFailed { error: String },
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: SessionEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// An event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: SessionEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Forward events to a tokio channel
pub struct ChannelEventSink {
    sender: tokio::sync::mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelEventSink {
    pub fn new(sender: tokio::sync::mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, event: SessionEvent) -> Result<(), EventError> {
        self.sender
            .send(event)
            .map_err(|_| EventError::channel_closed())
    }
}

/// Send an event, logging instead of failing when delivery fails
pub(crate) fn publish(sink: &dyn EventSink, event: SessionEvent) {
    if let Err(e) = sink.send(event) {
        log::warn!("Dropped session event: {}", e);
    }
}
