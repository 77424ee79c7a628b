//! Hookwire CLI: inspect persisted hook graphs.
//!
//! Usage:
//!   hookwire resolve <state.json> [--methods GET,POST] [--config-dir dir]
//!   hookwire check <state.json> [--methods GET,POST] [--config-dir dir]
//!   hookwire status [--save] [--config-dir dir]
//!
//! Exit codes: 0 success, 1 invalid input or I/O failure, 2 cycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hook_graph::{resolve, EditorState, GraphError, GraphStore, MethodSet};
use hook_session::{NullEventSink, SessionConfig, SessionCoordinator, SessionError};

#[derive(Parser)]
#[command(
    name = "hookwire",
    version,
    about = "Resolve hook graphs into per-method hook chains"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Directory holding hookwire.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    /// Comma-separated method names, overriding the configuration
    #[arg(long, global = true, value_delimiter = ',')]
    methods: Option<Vec<String>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the hook configuration a persisted editor state resolves to
    Resolve {
        /// Path to the editor state JSON
        state: PathBuf,
    },
    /// Validate a persisted editor state and report cycles
    Check {
        /// Path to the editor state JSON
        state: PathBuf,
    },
    /// Load the session stored under the configured storage directory
    ///
    /// Uses the methods from hookwire.json; --methods does not apply.
    Status {
        /// Persist the resolved configuration when it differs from the stored one
        #[arg(long)]
        save: bool,
    },
}

async fn load_methods(
    config_dir: Option<&Path>,
    methods: Option<Vec<String>>,
) -> Result<MethodSet, SessionError> {
    if let Some(methods) = methods {
        return Ok(MethodSet::new(methods)?);
    }
    match config_dir {
        Some(dir) => Ok(SessionConfig::load(dir).await?.methods),
        None => Ok(MethodSet::default()),
    }
}

async fn read_state(path: &Path) -> Result<EditorState, String> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

fn hydrate(methods: MethodSet, state: &EditorState) -> Result<GraphStore, i32> {
    match GraphStore::from_state(methods, state) {
        Ok(store) => Ok(store),
        Err(GraphError::InvalidGraph(errors)) => {
            eprintln!("Invalid graph ({} problems):", errors.len());
            for error in &errors {
                eprintln!("  - {}", error);
            }
            Err(1)
        }
        Err(e) => {
            log::error!("{}", e);
            Err(1)
        }
    }
}

fn cmd_resolve(methods: MethodSet, state: &EditorState) -> i32 {
    let store = match hydrate(methods, state) {
        Ok(store) => store,
        Err(code) => return code,
    };
    let config = match resolve(&store) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Resolution failed: {}", e);
            return 2;
        }
    };
    match serde_json::to_string_pretty(&config) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            log::error!("Failed to serialize configuration: {}", e);
            1
        }
    }
}

fn cmd_check(methods: MethodSet, state: &EditorState) -> i32 {
    let store = match hydrate(methods, state) {
        Ok(store) => store,
        Err(code) => return code,
    };
    match resolve(&store) {
        Ok(config) => {
            println!(
                "OK: {} units, {} edges, {} hooks across {} methods",
                store.unit_count(),
                store.edges().len(),
                config.hook_count(),
                store.methods().len()
            );
            0
        }
        Err(GraphError::CycleDetected { method, node }) => {
            eprintln!("Cycle in the {} chain at node '{}'", method, node);
            2
        }
        Err(e) => {
            log::error!("{}", e);
            1
        }
    }
}

async fn cmd_status(config_dir: &Path, save: bool) -> i32 {
    let mut session = match SessionCoordinator::open(config_dir, Arc::new(NullEventSink)).await {
        Ok(session) => session,
        Err(e) => {
            log::error!("{}", e);
            return 1;
        }
    };
    if let Err(e) = session.load().await {
        log::error!("Failed to load session: {}", e);
        return 1;
    }

    println!(
        "{}: {} units, {} edges",
        session.state(),
        session.graph().unit_count(),
        session.graph().edges().len()
    );
    if let Some(cycle) = session.outstanding_cycle() {
        eprintln!("Unresolved: {}", cycle);
        return 2;
    }
    if save && session.can_save() {
        if let Err(e) = session.save().await {
            log::error!("{}", e);
            return 1;
        }
        println!("Saved hook configuration");
    }
    0
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let (path, check) = match cli.command {
        Commands::Status { save } => {
            let config_dir = cli.config_dir.unwrap_or_else(|| PathBuf::from("."));
            std::process::exit(cmd_status(&config_dir, save).await);
        }
        Commands::Resolve { state } => (state, false),
        Commands::Check { state } => (state, true),
    };

    let methods = match load_methods(cli.config_dir.as_deref(), cli.methods).await {
        Ok(methods) => methods,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    let state = match read_state(&path).await {
        Ok(state) => state,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let code = if check {
        cmd_check(methods, &state)
    } else {
        cmd_resolve(methods, &state)
    };
    std::process::exit(code);
}
