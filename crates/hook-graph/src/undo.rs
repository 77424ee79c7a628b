//! Undo/redo over compressed editor-state snapshots
//!
//! A snapshot is an [`EditorState`] serialized to JSON and packed with
//! zstd. The stack keeps the present state as the last entry of `past`;
//! undone states move onto `future` until the next push discards them.
//! Restored states still go through [`GraphStore::from_state`], so an undo
//! can never produce a graph that breaks the port rules.
//!
//! [`GraphStore::from_state`]: crate::GraphStore::from_state

use std::collections::VecDeque;

use crate::error::{GraphError, Result};
use crate::types::EditorState;

const ZSTD_LEVEL: i32 = 3;

struct Snapshot(Vec<u8>);

impl Snapshot {
    fn capture(state: &EditorState) -> Result<Self> {
        let json = serde_json::to_vec(state)?;
        zstd::encode_all(json.as_slice(), ZSTD_LEVEL)
            .map(Snapshot)
            .map_err(|e| GraphError::Compression(e.to_string()))
    }

    fn restore(&self) -> Result<EditorState> {
        let json = zstd::decode_all(self.0.as_slice())
            .map_err(|e| GraphError::Compression(e.to_string()))?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// Bounded history of graph states
pub struct UndoStack {
    /// Oldest first; the back entry is the present state
    past: VecDeque<Snapshot>,
    /// Undone states, most recently undone last
    future: Vec<Snapshot>,
    /// Most snapshots kept in `past`
    depth: usize,
}

impl UndoStack {
    /// Create a stack remembering at most `depth` states (at least one)
    pub fn new(depth: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            depth: depth.max(1),
        }
    }

    /// Record a new present state, discarding any redo history
    pub fn push(&mut self, state: &EditorState) -> Result<()> {
        let snapshot = Snapshot::capture(state)?;
        self.future.clear();
        self.past.push_back(snapshot);
        while self.past.len() > self.depth {
            self.past.pop_front();
        }
        Ok(())
    }

    /// Overwrite the present state without adding an undo step
    pub fn replace_current(&mut self, state: &EditorState) -> Result<()> {
        let snapshot = Snapshot::capture(state)?;
        match self.past.back_mut() {
            Some(present) => *present = snapshot,
            None => self.past.push_back(snapshot),
        }
        Ok(())
    }

    /// Step back, returning the state that is now present
    pub fn undo(&mut self) -> Option<Result<EditorState>> {
        if !self.can_undo() {
            return None;
        }
        let present = self.past.pop_back()?;
        self.future.push(present);
        self.past.back().map(Snapshot::restore)
    }

    /// Step forward again after an undo
    pub fn redo(&mut self) -> Option<Result<EditorState>> {
        let next = self.future.pop()?;
        let state = next.restore();
        self.past.push_back(next);
        Some(state)
    }

    pub fn can_undo(&self) -> bool {
        self.past.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of undo steps available
    pub fn undo_steps(&self) -> usize {
        self.past.len().saturating_sub(1)
    }

    /// Number of redo steps available
    pub fn redo_steps(&self) -> usize {
        self.future.len()
    }

    /// Forget every state
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(100)
    }
}
