//! Session lifecycle against real stores

use std::sync::Arc;
use std::time::Duration;

use hook_graph::{
    after_port, before_port, ChainSide, HookChainConfig, PortRef, SERVICE_NODE_ID, UNIT_INPUT,
    UNIT_OUTPUT,
};
use hook_session::{
    EditorStateStore, HookConfigStore, JsonFileStore, MemoryStore, NullEventSink,
    SessionConfig, SessionCoordinator, SessionEvent, SessionState, VecEventSink,
};

fn out(node: &str) -> PortRef {
    PortRef::new(node, UNIT_OUTPUT)
}

fn inp(node: &str) -> PortRef {
    PortRef::new(node, UNIT_INPUT)
}

#[tokio::test]
async fn edits_survive_a_restart_through_the_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path()));

    let mut session = SessionCoordinator::with_store(
        SessionConfig::default(),
        store.clone(),
        Arc::new(NullEventSink),
    );
    session.load().await.unwrap();

    session.add_unit_with_id("auth", "jwt-auth", (-300.0, 0.0)).unwrap();
    session.add_unit_with_id("limit", "rate-limit", (-150.0, 0.0)).unwrap();
    session.add_unit_with_id("audit", "audit-log", (150.0, 0.0)).unwrap();
    session
        .connect(&out("auth"), &PortRef::new(SERVICE_NODE_ID, before_port("GET")))
        .unwrap();
    session.connect(&out("limit"), &inp("auth")).unwrap();
    session
        .connect(&PortRef::new(SERVICE_NODE_ID, after_port("POST")), &inp("audit"))
        .unwrap();
    assert_eq!(session.state(), SessionState::Dirty);

    session.save().await.unwrap();
    session.flush_layout().await;
    assert_eq!(session.state(), SessionState::Idle);

    let saved = store.load_hook_config().await.unwrap().unwrap();
    assert_eq!(saved.chain(ChainSide::Before, "GET"), ["rate-limit", "jwt-auth"]);
    assert_eq!(saved.chain(ChainSide::After, "POST"), ["audit-log"]);

    // a second session over the same directory sees a clean state
    let mut reopened = SessionCoordinator::with_store(
        SessionConfig::default(),
        store.clone(),
        Arc::new(NullEventSink),
    );
    reopened.load().await.unwrap();
    assert_eq!(reopened.state(), SessionState::Idle);
    assert_eq!(reopened.graph().unit_count(), 3);
    assert_eq!(reopened.graph().node("auth").unwrap().position, (-300.0, 0.0));
    assert_eq!(reopened.current_config(), &saved);
}

#[tokio::test]
async fn deleting_a_unit_rewires_and_marks_dirty() {
    let store = Arc::new(MemoryStore::new());
    let events = Arc::new(VecEventSink::new());
    let mut session =
        SessionCoordinator::with_store(SessionConfig::default(), store.clone(), events.clone());
    session.load().await.unwrap();

    for (id, hook) in [("a", "hook-a"), ("b", "hook-b"), ("c", "hook-c")] {
        session.add_unit_with_id(id, hook, (0.0, 0.0)).unwrap();
    }
    session
        .connect(&PortRef::new(SERVICE_NODE_ID, after_port("PUT")), &inp("a"))
        .unwrap();
    session.connect(&out("a"), &inp("b")).unwrap();
    session.connect(&out("b"), &inp("c")).unwrap();
    session.save().await.unwrap();
    events.clear();

    session.delete_node("b").unwrap();

    assert_eq!(session.state(), SessionState::Dirty);
    assert_eq!(
        session.current_config().chain(ChainSide::After, "PUT"),
        ["hook-a", "hook-c"]
    );
    assert!(events.events().contains(&SessionEvent::ConfigResolved {
        changed: vec!["after:PUT".to_string()],
    }));

    // undoing the delete brings back the persisted chain
    session.undo().unwrap();
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn existing_config_without_graph_is_dirty_after_load() {
    let mut persisted = HookChainConfig::empty_for(&SessionConfig::default().methods);
    persisted.set_chain(ChainSide::Before, "DELETE", vec!["admin-only".to_string()]);
    let store = Arc::new(MemoryStore::with_contents(None, Some(persisted)));

    let mut session =
        SessionCoordinator::with_store(SessionConfig::default(), store, Arc::new(NullEventSink));
    session.load().await.unwrap();

    assert_eq!(session.state(), SessionState::Dirty);
    assert!(session
        .current_config()
        .chain(ChainSide::Before, "DELETE")
        .is_empty());
}

#[tokio::test(start_paused = true)]
async fn dragging_saves_the_layout_once() {
    let store = Arc::new(MemoryStore::new());
    let config = SessionConfig {
        layout_debounce_ms: 500,
        ..Default::default()
    };
    let mut session =
        SessionCoordinator::with_store(config, store.clone(), Arc::new(NullEventSink));
    session.load().await.unwrap();
    session.add_unit_with_id("a", "hook-a", (0.0, 0.0)).unwrap();

    for step in 1..=10 {
        session.move_node("a", (step as f64 * 10.0, 0.0)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tokio::time::sleep(Duration::from_millis(1000)).await;

    assert_eq!(store.editor_saves(), 1);
    let saved = store.load_editor_state().await.unwrap().unwrap();
    assert_eq!(saved.find_node("a").unwrap().position, (100.0, 0.0));
}

#[tokio::test]
async fn custom_methods_limit_service_ports() {
    let config = SessionConfig {
        methods: hook_graph::MethodSet::new(["get"]).unwrap(),
        ..Default::default()
    };
    let mut session = SessionCoordinator::with_store(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(NullEventSink),
    );
    session.load().await.unwrap();
    session.add_unit_with_id("a", "hook-a", (0.0, 0.0)).unwrap();

    let err = session
        .connect(&out("a"), &PortRef::new(SERVICE_NODE_ID, before_port("POST")))
        .unwrap_err();
    assert!(!err.is_cycle());
    assert_eq!(session.current_config().before.len(), 1);
}
