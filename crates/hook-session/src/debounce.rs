//! Debounced layout saving
//!
//! Node positions and the viewport change constantly while an operator
//! drags things around, so editor-state saves are debounced: every
//! [`LayoutSaver::schedule`] replaces the pending save and restarts its
//! timer. At most one save is pending and at most one is in flight.
//!
//! Superseding a save drops its signal sender. The task only looks at the
//! signal before it calls the store, so a save that already reached the
//! store always runs to completion; the next save waits for it on the
//! shared write lock.

use std::sync::Arc;
use std::time::Duration;

use hook_graph::EditorState;
use log::{debug, warn};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::JoinHandle;

use crate::events::{publish, EventSink, SessionEvent};
use crate::persistence::EditorStateStore;

struct PendingSave {
    /// Sending saves now; dropping cancels
    signal: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Single-slot debounced saver for the editor state
pub struct LayoutSaver {
    store: Arc<dyn EditorStateStore>,
    events: Arc<dyn EventSink>,
    delay: Duration,
    write_lock: Arc<tokio::sync::Mutex<()>>,
    pending: Option<PendingSave>,
}

impl LayoutSaver {
    pub fn new(
        store: Arc<dyn EditorStateStore>,
        events: Arc<dyn EventSink>,
        delay: Duration,
    ) -> Self {
        Self {
            store,
            events,
            delay,
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
            pending: None,
        }
    }

    /// Whether a save is waiting for its timer
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| !p.handle.is_finished())
    }

    /// Schedule a save of `state`, replacing any pending one
    ///
    /// Must be called from within a tokio runtime; outside one the save is
    /// skipped with a warning.
    pub fn schedule(&mut self, state: EditorState) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, skipping layout save");
            return;
        };

        if let Some(previous) = self.pending.take() {
            if !previous.handle.is_finished() {
                debug!("Superseding pending layout save");
            }
            drop(previous.signal);
        }

        let (signal, receiver) = oneshot::channel();
        let handle = runtime.spawn(run_save(
            self.store.clone(),
            self.events.clone(),
            self.write_lock.clone(),
            self.delay,
            state,
            receiver,
        ));
        self.pending = Some(PendingSave { signal, handle });
    }

    /// Run the pending save now and wait for every outstanding write
    pub async fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            // the task may already be past its timer
            let _ = pending.signal.send(());
            if let Err(e) = pending.handle.await {
                warn!("Layout save task failed: {}", e);
            }
        }
        // a superseded save may still be writing
        let _guard = self.write_lock.lock().await;
    }

    /// Drop the pending save, if any
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            debug!("Cancelled pending layout save");
        }
    }
}

async fn run_save(
    store: Arc<dyn EditorStateStore>,
    events: Arc<dyn EventSink>,
    write_lock: Arc<tokio::sync::Mutex<()>>,
    delay: Duration,
    state: EditorState,
    mut signal: oneshot::Receiver<()>,
) {
    let flushed = tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        received = &mut signal => match received {
            Ok(()) => true,
            Err(_) => return,
        },
    };

    let _guard = write_lock.lock().await;
    if !flushed && matches!(signal.try_recv(), Err(TryRecvError::Closed)) {
        debug!("Layout save superseded while waiting for the store");
        return;
    }

    match store.save_editor_state(&state).await {
        Ok(()) => {
            debug!(
                "Saved editor layout ({} nodes, {} edges)",
                state.nodes.len(),
                state.edges.len()
            );
            publish(events.as_ref(), SessionEvent::LayoutSaved);
        }
        Err(e) => {
            warn!("Failed to save editor layout: {}", e);
            publish(
                events.as_ref(),
                SessionEvent::LayoutSaveFailed {
                    error: e.to_string(),
                },
            );
        }
    }
}
