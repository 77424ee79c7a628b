//! Session coordinator
//!
//! Owns the graph for one editing session and drives the
//! load -> edit -> resolve -> diff -> save cycle:
//!
//! ```text
//! Loading --load--> Idle <--edit--> Dirty --save--> Saving --ok--> Idle
//!                                     ^                |
//!                                     +-----failed-----+
//! ```
//!
//! Every structural edit re-resolves the hook chains and compares them with
//! the last persisted configuration to decide between `Idle` and `Dirty`.
//! A cycle keeps the last good configuration, leaves the state alone and
//! blocks saving until a later edit removes it. Every edit also schedules a
//! debounced save of the editor layout.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use hook_graph::{
    diff, resolve, EdgeId, EditorState, GraphError, GraphStore, HookChainConfig, NodeId,
    PortRef, UndoStack, Viewport,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::debounce::LayoutSaver;
use crate::error::{Result, SessionError};
use crate::events::{publish, EventSink, SessionEvent};
use crate::persistence::{EditorStateStore, HookConfigStore, JsonFileStore};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// Waiting for (or retrying) the initial load
    Loading,
    /// Resolved configuration matches the persisted one
    Idle,
    /// Resolved configuration differs from the persisted one
    Dirty,
    /// A configuration save is in progress
    Saving,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Idle => "idle",
            Self::Dirty => "dirty",
            Self::Saving => "saving",
        };
        f.write_str(name)
    }
}

/// A cycle found by the latest resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub method: String,
    pub node: NodeId,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle in {} chain at node '{}'", self.method, self.node)
    }
}

/// Coordinates one editing session over a hook graph
pub struct SessionCoordinator {
    config: SessionConfig,
    hook_store: Arc<dyn HookConfigStore>,
    editor_store: Arc<dyn EditorStateStore>,
    events: Arc<dyn EventSink>,
    layout: LayoutSaver,
    state: SessionState,
    graph: GraphStore,
    viewport: Option<Viewport>,
    undo: UndoStack,
    /// Last successfully resolved configuration
    current: HookChainConfig,
    /// Configuration as last loaded from or saved to the store
    persisted: HookChainConfig,
    cycle: Option<CycleReport>,
}

impl SessionCoordinator {
    pub fn new(
        config: SessionConfig,
        editor_store: Arc<dyn EditorStateStore>,
        hook_store: Arc<dyn HookConfigStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let layout =
            LayoutSaver::new(editor_store.clone(), events.clone(), config.layout_debounce());
        let empty = HookChainConfig::empty_for(&config.methods);
        Self {
            graph: GraphStore::new(config.methods.clone()),
            undo: UndoStack::new(config.undo_depth),
            config,
            hook_store,
            editor_store,
            events,
            layout,
            state: SessionState::Loading,
            viewport: None,
            current: empty.clone(),
            persisted: empty,
            cycle: None,
        }
    }

    /// Create a session backed by one store implementing both contracts
    pub fn with_store<S>(config: SessionConfig, store: Arc<S>, events: Arc<dyn EventSink>) -> Self
    where
        S: EditorStateStore + HookConfigStore + 'static,
    {
        Self::new(config, store.clone(), store, events)
    }

    /// Create a session from the `hookwire.json` in `config_dir`
    ///
    /// Records are kept in a [`JsonFileStore`] under the configured
    /// storage directory. The session still needs [`load`](Self::load).
    pub async fn open(config_dir: &Path, events: Arc<dyn EventSink>) -> Result<Self> {
        let config = SessionConfig::load(config_dir).await?;
        let storage = config.storage_path(config_dir);
        info!("Opening session with records in {:?}", storage);
        let store = Arc::new(JsonFileStore::new(storage));
        Ok(Self::with_store(config, store, events))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// The last successfully resolved configuration
    pub fn current_config(&self) -> &HookChainConfig {
        &self.current
    }

    /// The configuration the store holds
    pub fn persisted_config(&self) -> &HookChainConfig {
        &self.persisted
    }

    /// The cycle blocking saves, if any
    pub fn outstanding_cycle(&self) -> Option<&CycleReport> {
        self.cycle.as_ref()
    }

    /// The configuration the current graph resolves to
    ///
    /// Fails with a cycle error (`is_cycle()`) while a cycle is
    /// outstanding; [`current_config`](Self::current_config) then still
    /// holds the last good configuration.
    pub fn resolved_config(&self) -> Result<&HookChainConfig> {
        match &self.cycle {
            Some(cycle) => Err(GraphError::CycleDetected {
                method: cycle.method.clone(),
                node: cycle.node.clone(),
            }
            .into()),
            None => Ok(&self.current),
        }
    }

    pub fn can_save(&self) -> bool {
        self.state == SessionState::Dirty && self.cycle.is_none()
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn undo_steps(&self) -> usize {
        self.undo.undo_steps()
    }

    pub fn redo_steps(&self) -> usize {
        self.undo.redo_steps()
    }

    /// The editor state as it would be persisted
    pub fn editor_state(&self) -> EditorState {
        self.graph.to_state(self.viewport)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load the persisted graph and configuration
    ///
    /// On failure the session stays in `Loading` and the error is returned;
    /// calling `load` again retries.
    pub async fn load(&mut self) -> Result<()> {
        self.ensure_state("load", &[SessionState::Loading])?;

        let (graph, viewport, persisted) = match self.fetch().await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Failed to load session: {}", e);
                publish(
                    self.events.as_ref(),
                    SessionEvent::LoadFailed {
                        error: e.to_string(),
                    },
                );
                return Err(e);
            }
        };

        info!(
            "Loaded hook graph with {} units and {} edges",
            graph.unit_count(),
            graph.edges().len()
        );
        self.graph = graph;
        self.viewport = viewport;
        self.persisted = persisted.clone();
        self.current = persisted;
        self.undo.clear();
        self.undo.push(&self.graph.to_state(None))?;

        match self.recompute() {
            Ok(()) => {}
            Err(e) if e.is_cycle() => self.transition(SessionState::Idle),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn fetch(&self) -> Result<(GraphStore, Option<Viewport>, HookChainConfig)> {
        let methods = self.config.methods.clone();

        let (mut graph, viewport) = match self.editor_store.load_editor_state().await? {
            Some(state) => (GraphStore::from_state(methods, &state)?, state.viewport),
            None => {
                debug!("No persisted editor state, starting with an empty graph");
                (GraphStore::new(methods), None)
            }
        };
        let persisted = self
            .hook_store
            .load_hook_config()
            .await?
            .unwrap_or_else(|| HookChainConfig::empty_for(&self.config.methods));

        graph.take_changes();
        Ok((graph, viewport, persisted))
    }

    // =========================================================================
    // Edits
    //
    // Structural edits are applied even when they close a cycle. The call
    // returns `Ok`, the cycle is published as `CycleDetected` and kept in
    // `outstanding_cycle()`, and `resolved_config()` returns it as an error
    // until a later edit or undo removes it.
    // =========================================================================

    /// Add a unit for `hook_type`, returning its generated id
    pub fn add_unit(&mut self, hook_type: &str, position: (f64, f64)) -> Result<NodeId> {
        self.edit("add a unit", true, |graph| Ok(graph.add_unit(hook_type, position)))
    }

    /// Add a unit with a caller-chosen id
    pub fn add_unit_with_id(
        &mut self,
        id: &str,
        hook_type: &str,
        position: (f64, f64),
    ) -> Result<NodeId> {
        self.edit("add a unit", true, |graph| {
            graph.add_unit_with_id(id, hook_type, position)
        })
    }

    /// Connect two ports, returning the edge id
    ///
    /// A connection that closes a cycle is kept; check
    /// [`resolved_config`](Self::resolved_config) afterwards.
    pub fn connect(&mut self, source: &PortRef, target: &PortRef) -> Result<EdgeId> {
        self.edit("connect", true, |graph| graph.connect(source, target))
    }

    pub fn disconnect(&mut self, edge_id: &str) -> Result<()> {
        self.edit("disconnect", true, |graph| graph.disconnect(edge_id).map(|_| ()))
    }

    /// Delete a unit, rewiring its neighbours
    ///
    /// The rewired edges may close a cycle, reported as for `connect`.
    pub fn delete_node(&mut self, node_id: &str) -> Result<()> {
        self.edit("delete a node", true, |graph| graph.delete_node(node_id).map(|_| ()))
    }

    /// Move a node on the canvas; never changes the resolved chains
    pub fn move_node(&mut self, node_id: &str, position: (f64, f64)) -> Result<()> {
        self.edit("move a node", false, |graph| graph.move_node(node_id, position))
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_editable("set the viewport")?;
        self.viewport = Some(viewport);
        let layout = self.editor_state();
        self.layout.schedule(layout);
        Ok(())
    }

    /// Step back to the previous graph; `false` when there is none
    pub fn undo(&mut self) -> Result<bool> {
        self.ensure_editable("undo")?;
        match self.undo.undo() {
            Some(snapshot) => {
                self.restore(snapshot?)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-apply an undone graph; `false` when there is none
    pub fn redo(&mut self) -> Result<bool> {
        self.ensure_editable("redo")?;
        match self.undo.redo() {
            Some(snapshot) => {
                self.restore(snapshot?)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn edit<T>(
        &mut self,
        operation: &'static str,
        structural: bool,
        apply: impl FnOnce(&mut GraphStore) -> hook_graph::Result<T>,
    ) -> Result<T> {
        self.ensure_editable(operation)?;
        let value = apply(&mut self.graph)?;

        let changes = self.graph.take_changes();
        if changes.is_empty() {
            return Ok(value);
        }
        for change in changes {
            publish(self.events.as_ref(), SessionEvent::GraphChanged { change });
        }

        let snapshot = self.graph.to_state(None);
        if structural {
            self.undo.push(&snapshot)?;
        } else {
            self.undo.replace_current(&snapshot)?;
        }
        let layout = self.editor_state();
        self.layout.schedule(layout);

        if structural {
            self.settle()?;
        }
        Ok(value)
    }

    fn restore(&mut self, state: EditorState) -> Result<()> {
        self.graph = GraphStore::from_state(self.config.methods.clone(), &state)?;
        self.graph.take_changes();
        debug!("Restored graph snapshot with {} edges", self.graph.edges().len());
        let layout = self.editor_state();
        self.layout.schedule(layout);
        self.settle()
    }

    /// Re-resolve after an applied edit; a cycle is recorded, not returned
    fn settle(&mut self) -> Result<()> {
        match self.recompute() {
            Err(e) if e.is_cycle() => Ok(()),
            other => other,
        }
    }

    fn recompute(&mut self) -> Result<()> {
        match resolve(&self.graph) {
            Ok(config) => {
                if let Some(cycle) = self.cycle.take() {
                    info!("Resolved after clearing {}", cycle);
                    publish(self.events.as_ref(), SessionEvent::CycleCleared);
                }
                let changed = diff(&config, &self.persisted);
                debug!("Resolved configuration, {}", changed);
                publish(
                    self.events.as_ref(),
                    SessionEvent::ConfigResolved {
                        changed: changed
                            .changed
                            .iter()
                            .map(|(side, method)| format!("{}:{}", side, method))
                            .collect(),
                    },
                );
                self.current = config;
                self.transition(if changed.is_empty() {
                    SessionState::Idle
                } else {
                    SessionState::Dirty
                });
                Ok(())
            }
            Err(GraphError::CycleDetected { method, node }) => {
                let report = CycleReport {
                    method: method.clone(),
                    node: node.clone(),
                };
                warn!("Keeping last good configuration: {}", report);
                publish(
                    self.events.as_ref(),
                    SessionEvent::CycleDetected {
                        method: method.clone(),
                        node: node.clone(),
                    },
                );
                self.cycle = Some(report);
                Err(GraphError::CycleDetected { method, node }.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Saving
    // =========================================================================

    /// Persist the resolved configuration
    ///
    /// Only allowed in `Dirty` with no outstanding cycle. On failure the
    /// session returns to `Dirty`. If the returned future is dropped
    /// mid-save, the session reports `Saving` until its next operation,
    /// which returns it to `Dirty`.
    pub async fn save(&mut self) -> Result<()> {
        self.recover_interrupted_save();
        match self.state {
            SessionState::Dirty => {}
            SessionState::Idle if self.cycle.is_none() => return Err(SessionError::NothingToSave),
            SessionState::Idle => {}
            state => {
                return Err(SessionError::InvalidState {
                    operation: "save",
                    state,
                })
            }
        }
        if let Some(cycle) = &self.cycle {
            debug!("Save blocked by {}", cycle);
            return Err(SessionError::CycleOutstanding);
        }

        self.transition(SessionState::Saving);
        let config = self.current.clone();
        match self.hook_store.save_hook_config(&config).await {
            Ok(()) => {
                info!("Saved hook configuration ({} hooks)", config.hook_count());
                self.persisted = config;
                publish(self.events.as_ref(), SessionEvent::ConfigSaved);
                self.transition(SessionState::Idle);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to save hook configuration: {}", e);
                publish(
                    self.events.as_ref(),
                    SessionEvent::SaveFailed {
                        error: e.to_string(),
                    },
                );
                self.transition(SessionState::Dirty);
                Err(e.into())
            }
        }
    }

    /// Write any pending layout save now and wait for it
    pub async fn flush_layout(&mut self) {
        self.layout.flush().await;
    }

    // =========================================================================
    // State
    // =========================================================================

    fn ensure_editable(&mut self, operation: &'static str) -> Result<()> {
        self.recover_interrupted_save();
        self.ensure_state(operation, &[SessionState::Idle, SessionState::Dirty])
    }

    /// `save` holds `&mut self` until it finishes, so `Saving` seen from any
    /// other call means its future was dropped before the store answered.
    fn recover_interrupted_save(&mut self) {
        if self.state == SessionState::Saving {
            warn!("Previous save was interrupted, configuration may not be persisted");
            self.transition(SessionState::Dirty);
        }
    }

    fn ensure_state(&self, operation: &'static str, allowed: &[SessionState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn transition(&mut self, to: SessionState) {
        if self.state == to {
            return;
        }
        debug!("Session {} -> {}", self.state, to);
        publish(
            self.events.as_ref(),
            SessionEvent::StateChanged {
                from: self.state,
                to,
            },
        );
        self.state = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecEventSink;
    use crate::persistence::MemoryStore;
    use std::time::Duration;

    use crate::error::PersistenceError;
    use async_trait::async_trait;
    use hook_graph::{
        before_port, ChainSide, GraphBuilder, SERVICE_NODE_ID, UNIT_INPUT, UNIT_OUTPUT,
    };

    fn out(node: &str) -> PortRef {
        PortRef::new(node, UNIT_OUTPUT)
    }

    fn inp(node: &str) -> PortRef {
        PortRef::new(node, UNIT_INPUT)
    }

    fn before_get() -> PortRef {
        PortRef::new(SERVICE_NODE_ID, before_port("GET"))
    }

    fn session(store: &Arc<MemoryStore>) -> (SessionCoordinator, Arc<VecEventSink>) {
        let events = Arc::new(VecEventSink::new());
        let session = SessionCoordinator::with_store(
            SessionConfig::default(),
            store.clone(),
            events.clone(),
        );
        (session, events)
    }

    async fn loaded(store: &Arc<MemoryStore>) -> (SessionCoordinator, Arc<VecEventSink>) {
        let (mut session, events) = session(store);
        session.load().await.unwrap();
        (session, events)
    }

    #[tokio::test]
    async fn test_fresh_session_loads_idle() {
        let store = Arc::new(MemoryStore::new());
        let (session, _) = loaded(&store).await;

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.graph().nodes().len(), 1);
        assert!(!session.can_undo());
    }

    #[tokio::test]
    async fn test_edits_rejected_before_load() {
        let store = Arc::new(MemoryStore::new());
        let (mut session, _) = session(&store);

        let err = session.add_unit("auth", (0.0, 0.0)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState {
                state: SessionState::Loading,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_load_failure_stays_loading() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_loads(true);
        let (mut session, events) = session(&store);

        let err = session.load().await.unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(session.state(), SessionState::Loading);
        assert!(matches!(events.events()[0], SessionEvent::LoadFailed { .. }));

        store.set_fail_loads(false);
        session.load().await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_graph() {
        let mut state = GraphBuilder::new()
            .unit("a", "auth")
            .before("GET", "a")
            .build()
            .unwrap()
            .to_state(None);
        state.edges[0].target_handle = "before:TRACE".to_string();
        let store = Arc::new(MemoryStore::with_contents(Some(state), None));
        let (mut session, _) = session(&store);

        let err = session.load().await.unwrap_err();
        assert!(matches!(err, SessionError::Graph(GraphError::InvalidGraph(_))));
        assert_eq!(session.state(), SessionState::Loading);
    }

    #[tokio::test]
    async fn test_edit_marks_dirty_and_undo_restores_idle() {
        let store = Arc::new(MemoryStore::new());
        let (mut session, _) = loaded(&store).await;

        let a = session.add_unit("auth", (0.0, 0.0)).unwrap();
        assert_eq!(session.state(), SessionState::Idle);

        session.connect(&out(&a), &before_get()).unwrap();
        assert_eq!(session.state(), SessionState::Dirty);
        assert_eq!(
            session.current_config().chain(ChainSide::Before, "GET"),
            ["auth"]
        );

        assert_eq!(session.undo_steps(), 2);
        assert!(session.undo().unwrap());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.graph().edges().is_empty());
        assert_eq!((session.undo_steps(), session.redo_steps()), (1, 1));

        assert!(session.redo().unwrap());
        assert_eq!(session.state(), SessionState::Dirty);
        assert_eq!(session.graph().edges().len(), 1);
    }

    #[tokio::test]
    async fn test_move_node_keeps_state_and_undo_history() {
        let store = Arc::new(MemoryStore::new());
        let (mut session, events) = loaded(&store).await;
        let a = session.add_unit("auth", (0.0, 0.0)).unwrap();
        events.clear();

        session.move_node(&a, (40.0, 80.0)).unwrap();

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.graph().node(&a).unwrap().position, (40.0, 80.0));
        assert!(!events
            .events()
            .iter()
            .any(|e| matches!(e, SessionEvent::ConfigResolved { .. })));

        // undo skips over the move back to the empty graph
        assert!(session.undo().unwrap());
        assert!(session.graph().node(&a).is_none());
        assert!(!session.can_undo());
    }

    #[tokio::test]
    async fn test_save_persists_and_returns_idle() {
        let store = Arc::new(MemoryStore::new());
        let (mut session, events) = loaded(&store).await;
        assert!(matches!(session.save().await, Err(SessionError::NothingToSave)));

        let a = session.add_unit("auth", (0.0, 0.0)).unwrap();
        session.connect(&out(&a), &before_get()).unwrap();
        session.save().await.unwrap();

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(store.hook_config().as_ref(), Some(session.current_config()));
        assert_eq!(session.persisted_config(), session.current_config());

        let states: Vec<_> = events
            .events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::StateChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                SessionState::Idle,
                SessionState::Dirty,
                SessionState::Saving,
                SessionState::Idle
            ]
        );
    }

    #[tokio::test]
    async fn test_save_failure_stays_dirty() {
        let store = Arc::new(MemoryStore::new());
        let (mut session, _) = loaded(&store).await;
        let a = session.add_unit("auth", (0.0, 0.0)).unwrap();
        session.connect(&out(&a), &before_get()).unwrap();

        store.set_fail_saves(true);
        let err = session.save().await.unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(session.state(), SessionState::Dirty);
        assert!(store.hook_config().is_none());

        store.set_fail_saves(false);
        session.save().await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_cycle_keeps_config_and_blocks_save() {
        let store = Arc::new(MemoryStore::new());
        let (mut session, events) = loaded(&store).await;
        session.add_unit_with_id("a", "hook-a", (0.0, 0.0)).unwrap();
        session.add_unit_with_id("b", "hook-b", (0.0, 0.0)).unwrap();
        session.connect(&out("a"), &before_get()).unwrap();
        session.connect(&out("b"), &inp("a")).unwrap();
        let good = session.current_config().clone();
        assert_eq!(session.state(), SessionState::Dirty);

        session.connect(&out("a"), &inp("b")).unwrap();

        assert_eq!(session.state(), SessionState::Dirty);
        assert_eq!(session.current_config(), &good);
        assert_eq!(session.outstanding_cycle().unwrap().method, "GET");
        assert!(!session.can_save());
        assert!(events
            .events()
            .iter()
            .any(|e| matches!(e, SessionEvent::CycleDetected { .. })));

        let err = session.save().await.unwrap_err();
        assert!(matches!(err, SessionError::CycleOutstanding));
        assert!(err.is_cycle());

        let loop_edge = session.graph().edges_at(&inp("b")).next().unwrap().id.clone();
        session.disconnect(&loop_edge).unwrap();
        assert!(session.outstanding_cycle().is_none());
        session.save().await.unwrap();
    }

    #[tokio::test]
    async fn test_cycle_closing_edit_is_applied_and_reported() {
        let store = Arc::new(MemoryStore::new());
        let (mut session, _) = loaded(&store).await;
        session.add_unit_with_id("a", "hook-a", (0.0, 0.0)).unwrap();
        session.add_unit_with_id("b", "hook-b", (0.0, 0.0)).unwrap();
        session.connect(&out("a"), &before_get()).unwrap();
        session.connect(&out("b"), &inp("a")).unwrap();
        assert!(session.resolved_config().is_ok());

        let loop_edge = session.connect(&out("a"), &inp("b")).unwrap();

        assert!(session.graph().edge(&loop_edge).is_some());
        let err = session.resolved_config().unwrap_err();
        assert!(err.is_cycle());
        assert!(matches!(
            err,
            SessionError::Graph(GraphError::CycleDetected { ref method, .. }) if method == "GET"
        ));

        assert!(session.undo().unwrap());
        assert_eq!(
            session.resolved_config().unwrap().chain(ChainSide::Before, "GET"),
            ["hook-b", "hook-a"]
        );
    }

    #[tokio::test]
    async fn test_load_with_cycle_enters_idle_with_persisted_config() {
        let graph = GraphBuilder::new()
            .unit("a", "hook-a")
            .unit("b", "hook-b")
            .before("GET", "a")
            .link("b", "a")
            .link("a", "b")
            .build()
            .unwrap();
        let mut persisted = HookChainConfig::empty_for(&SessionConfig::default().methods);
        persisted.set_chain(ChainSide::Before, "GET", vec!["hook-a".to_string()]);
        let store = Arc::new(MemoryStore::with_contents(
            Some(graph.to_state(None)),
            Some(persisted.clone()),
        ));

        let (session, _) = loaded(&store).await;

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.current_config(), &persisted);
        assert!(session.outstanding_cycle().is_some());
    }

    #[tokio::test]
    async fn test_rejected_edit_leaves_graph_unchanged() {
        let store = Arc::new(MemoryStore::new());
        let (mut session, _) = loaded(&store).await;

        let err = session.delete_node(SERVICE_NODE_ID).unwrap_err();
        assert!(matches!(err, SessionError::Graph(GraphError::InvalidOperation(_))));
        assert!(matches!(
            session.disconnect("edge:missing"),
            Err(SessionError::Graph(GraphError::NotFound(_)))
        ));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.can_undo());
    }

    #[tokio::test]
    async fn test_edits_schedule_layout_save() {
        let store = Arc::new(MemoryStore::new());
        let (mut session, _) = loaded(&store).await;

        session.add_unit_with_id("a", "auth", (10.0, 20.0)).unwrap();
        session
            .set_viewport(Viewport {
                x: 5.0,
                y: 5.0,
                zoom: 2.0,
            })
            .unwrap();
        session.flush_layout().await;

        let saved = store.editor_state().unwrap();
        assert!(saved.find_node("a").is_some());
        assert_eq!(saved.viewport.unwrap().zoom, 2.0);
        assert_eq!(store.editor_saves(), 1);
    }

    /// Hook store whose saves never complete
    struct StalledSaves;

    #[async_trait]
    impl HookConfigStore for StalledSaves {
        async fn load_hook_config(
            &self,
        ) -> std::result::Result<Option<HookChainConfig>, PersistenceError> {
            Ok(None)
        }

        async fn save_hook_config(
            &self,
            _config: &HookChainConfig,
        ) -> std::result::Result<(), PersistenceError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_dropped_save_returns_to_dirty_on_next_edit() {
        let events = Arc::new(VecEventSink::new());
        let mut session = SessionCoordinator::new(
            SessionConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(StalledSaves),
            events.clone(),
        );
        session.load().await.unwrap();
        session.add_unit_with_id("a", "auth", (0.0, 0.0)).unwrap();
        session.connect(&out("a"), &before_get()).unwrap();

        let timed_out = tokio::time::timeout(Duration::from_millis(20), session.save()).await;
        assert!(timed_out.is_err());
        assert_eq!(session.state(), SessionState::Saving);

        session.move_node("a", (10.0, 0.0)).unwrap();

        assert_eq!(session.state(), SessionState::Dirty);
        assert!(events.events().contains(&SessionEvent::StateChanged {
            from: SessionState::Saving,
            to: SessionState::Dirty,
        }));
        assert!(session.can_save());
    }

    #[tokio::test]
    async fn test_open_reads_config_and_storage_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(crate::config::CONFIG_FILE),
            r#"{"methods": ["GET"], "storageDir": "records"}"#,
        )
        .unwrap();

        let mut session = SessionCoordinator::open(dir.path(), Arc::new(VecEventSink::new()))
            .await
            .unwrap();
        assert_eq!(session.config().methods.len(), 1);
        session.load().await.unwrap();
        session.add_unit_with_id("a", "auth", (0.0, 0.0)).unwrap();
        session.connect(&out("a"), &before_get()).unwrap();
        session.save().await.unwrap();
        session.flush_layout().await;

        let records = dir.path().join("records");
        assert!(records.join(crate::persistence::HOOK_CONFIG_FILE).exists());
        assert!(records.join(crate::persistence::EDITOR_STATE_FILE).exists());
    }

    #[tokio::test]
    async fn test_open_reports_malformed_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(crate::config::CONFIG_FILE), "{ not json").unwrap();

        let opened = SessionCoordinator::open(dir.path(), Arc::new(VecEventSink::new())).await;
        assert!(matches!(
            opened,
            Err(SessionError::Config(crate::config::ConfigError::Parse(_)))
        ));
    }
}
