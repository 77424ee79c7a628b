//! Persistence contracts and stores
//!
//! The session talks to its backing store through two async traits: one
//! for the editor state (graph records plus viewport) and one for the
//! resolved hook configuration. [`MemoryStore`] keeps both in memory and
//! can be told to fail, which the coordinator tests rely on.
//! [`JsonFileStore`] writes them as pretty JSON files under a directory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use hook_graph::{EditorState, HookChainConfig};
use parking_lot::Mutex;
use tokio::fs;

use crate::error::PersistenceError;

/// File holding the persisted editor state
pub const EDITOR_STATE_FILE: &str = "editor-state.json";

/// File holding the persisted hook configuration
pub const HOOK_CONFIG_FILE: &str = "hook-config.json";

/// Load and save the editor state
#[async_trait]
pub trait EditorStateStore: Send + Sync {
    /// Load the persisted state; `None` when nothing was saved yet
    async fn load_editor_state(&self) -> Result<Option<EditorState>, PersistenceError>;

    async fn save_editor_state(&self, state: &EditorState) -> Result<(), PersistenceError>;
}

/// Load and save the resolved hook configuration
#[async_trait]
pub trait HookConfigStore: Send + Sync {
    /// Load the persisted configuration; `None` when nothing was saved yet
    async fn load_hook_config(&self) -> Result<Option<HookChainConfig>, PersistenceError>;

    async fn save_hook_config(&self, config: &HookChainConfig) -> Result<(), PersistenceError>;
}

/// In-memory store for both contracts
///
/// Failures can be injected per operation to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    editor_state: Mutex<Option<EditorState>>,
    hook_config: Mutex<Option<HookChainConfig>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    editor_saves: AtomicUsize,
    config_saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with persisted records
    pub fn with_contents(state: Option<EditorState>, config: Option<HookChainConfig>) -> Self {
        Self {
            editor_state: Mutex::new(state),
            hook_config: Mutex::new(config),
            ..Default::default()
        }
    }

    /// Make every subsequent load fail
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent save fail
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn editor_state(&self) -> Option<EditorState> {
        self.editor_state.lock().clone()
    }

    pub fn hook_config(&self) -> Option<HookChainConfig> {
        self.hook_config.lock().clone()
    }

    /// Number of successful editor-state saves
    pub fn editor_saves(&self) -> usize {
        self.editor_saves.load(Ordering::SeqCst)
    }

    /// Number of successful hook-config saves
    pub fn config_saves(&self) -> usize {
        self.config_saves.load(Ordering::SeqCst)
    }

    fn check(&self, flag: &AtomicBool, operation: &str) -> Result<(), PersistenceError> {
        if flag.load(Ordering::SeqCst) {
            return Err(PersistenceError::unavailable(format!(
                "{} failed (injected)",
                operation
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl EditorStateStore for MemoryStore {
    async fn load_editor_state(&self) -> Result<Option<EditorState>, PersistenceError> {
        self.check(&self.fail_loads, "load editor state")?;
        Ok(self.editor_state.lock().clone())
    }

    async fn save_editor_state(&self, state: &EditorState) -> Result<(), PersistenceError> {
        self.check(&self.fail_saves, "save editor state")?;
        *self.editor_state.lock() = Some(state.clone());
        self.editor_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl HookConfigStore for MemoryStore {
    async fn load_hook_config(&self) -> Result<Option<HookChainConfig>, PersistenceError> {
        self.check(&self.fail_loads, "load hook config")?;
        Ok(self.hook_config.lock().clone())
    }

    async fn save_hook_config(&self, config: &HookChainConfig) -> Result<(), PersistenceError> {
        self.check(&self.fail_saves, "save hook config")?;
        *self.hook_config.lock() = Some(config.clone());
        self.config_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Store writing both records as JSON files under one directory
///
/// The directory is created on first save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read<T: serde::de::DeserializeOwned>(
        &self,
        file: &str,
    ) -> Result<Option<T>, PersistenceError> {
        let path = self.dir.join(file);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).await?;
        let value = serde_json::from_str(&content)?;
        log::debug!("Loaded {:?}", path);
        Ok(Some(value))
    }

    async fn write<T: serde::Serialize + Sync>(
        &self,
        file: &str,
        value: &T,
    ) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file);
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&path, content).await?;
        log::debug!("Saved {:?}", path);
        Ok(())
    }
}

#[async_trait]
impl EditorStateStore for JsonFileStore {
    async fn load_editor_state(&self) -> Result<Option<EditorState>, PersistenceError> {
        self.read(EDITOR_STATE_FILE).await
    }

    async fn save_editor_state(&self, state: &EditorState) -> Result<(), PersistenceError> {
        self.write(EDITOR_STATE_FILE, state).await
    }
}

#[async_trait]
impl HookConfigStore for JsonFileStore {
    async fn load_hook_config(&self) -> Result<Option<HookChainConfig>, PersistenceError> {
        self.read(HOOK_CONFIG_FILE).await
    }

    async fn save_hook_config(&self, config: &HookChainConfig) -> Result<(), PersistenceError> {
        self.write(HOOK_CONFIG_FILE, config).await
    }
}
