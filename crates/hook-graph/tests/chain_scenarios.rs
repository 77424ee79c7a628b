//! End-to-end scenarios for editing and resolving hook graphs

use hook_graph::{
    after_port, before_port, diff, differs, resolve, ChainSide, GraphBuilder, GraphError,
    GraphStore, MethodSet, PortRef, UNIT_INPUT, UNIT_OUTPUT, SERVICE_NODE_ID,
};

fn out(node: &str) -> PortRef {
    PortRef::new(node, UNIT_OUTPUT)
}

fn inp(node: &str) -> PortRef {
    PortRef::new(node, UNIT_INPUT)
}

fn before(method: &str) -> PortRef {
    PortRef::new(SERVICE_NODE_ID, before_port(method))
}

fn after(method: &str) -> PortRef {
    PortRef::new(SERVICE_NODE_ID, after_port(method))
}

#[test]
fn before_chain_runs_farthest_first() {
    let mut store = GraphStore::new(MethodSet::default());
    store.add_unit_with_id("unit-a", "hook-a", (0.0, 0.0)).unwrap();
    store.add_unit_with_id("unit-b", "hook-b", (0.0, 0.0)).unwrap();

    store.connect(&out("unit-a"), &before("GET")).unwrap();
    store.connect(&out("unit-b"), &inp("unit-a")).unwrap();

    let config = resolve(&store).unwrap();
    assert_eq!(config.chain(ChainSide::Before, "GET"), ["hook-b", "hook-a"]);
}

#[test]
fn after_chain_runs_closest_first() {
    let mut store = GraphStore::new(MethodSet::default());
    store.add_unit_with_id("unit-c", "hook-c", (0.0, 0.0)).unwrap();
    store.add_unit_with_id("unit-d", "hook-d", (0.0, 0.0)).unwrap();

    store.connect(&after("POST"), &inp("unit-c")).unwrap();
    store.connect(&out("unit-c"), &inp("unit-d")).unwrap();

    let config = resolve(&store).unwrap();
    assert_eq!(config.chain(ChainSide::After, "POST"), ["hook-c", "hook-d"]);
}

#[test]
fn second_connection_replaces_first_on_single_input() {
    let mut store = GraphStore::new(MethodSet::default());
    for id in ["a", "b", "c"] {
        store.add_unit_with_id(id, id, (0.0, 0.0)).unwrap();
    }

    store.connect(&out("a"), &inp("c")).unwrap();
    let newer = store.connect(&out("b"), &inp("c")).unwrap();

    let c_in = inp("c");
    let at_port: Vec<_> = store.edges_at(&c_in).collect();
    assert_eq!(at_port.len(), 1);
    assert_eq!(at_port[0].id, newer);
}

#[test]
fn any_connect_sequence_leaves_one_edge_per_single_port() {
    let units = ["a", "b", "c", "d", "e"];
    let mut store = GraphStore::new(MethodSet::new(["GET", "POST"]).unwrap());
    for id in units {
        store.add_unit_with_id(id, format!("hook-{}", id), (0.0, 0.0)).unwrap();
    }

    // deterministic pseudo-random sequence of connections
    let mut seed: u32 = 7;
    for _ in 0..200 {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let from = units[(seed >> 8) as usize % units.len()];
        let to = units[(seed >> 16) as usize % units.len()];
        let _ = match (seed >> 4) % 4 {
            0 => store.connect(&out(from), &before("GET")),
            1 => store.connect(&after("POST"), &inp(to)),
            2 if from != to => store.connect(&out(from), &inp(to)),
            _ => store.connect(&out(from), &before("POST")),
        };
    }

    for port in [before("GET"), before("POST"), after("GET"), after("POST")] {
        assert!(store.edges_at(&port).count() <= 1, "port {} overloaded", port);
    }
    for id in units {
        assert!(store.edges_at(&inp(id)).count() <= 1, "input of {} overloaded", id);
    }
}

#[test]
fn fan_out_coexists_and_never_duplicates_nodes() {
    let mut store = GraphBuilder::new()
        .unit("hub", "hub")
        .unit("x", "x")
        .unit("y", "y")
        .unit("z", "z")
        .after("GET", "hub")
        .link("hub", "x")
        .link("hub", "y")
        .link("hub", "z")
        .build()
        .unwrap();
    assert_eq!(store.outgoing("hub").count(), 3);

    // the same hub also feeds before:GET
    store.connect(&out("hub"), &before("GET")).unwrap();
    assert_eq!(store.outgoing("hub").count(), 4);

    let config = resolve(&store).unwrap();
    assert_eq!(config.chain(ChainSide::After, "GET"), ["hub", "x"]);
    assert_eq!(config.chain(ChainSide::Before, "GET"), ["hub"]);
}

#[test]
fn deleting_a_middle_node_only_removes_its_hook() {
    let mut store = GraphBuilder::new()
        .unit("unit-a", "hook-a")
        .unit("unit-b", "hook-b")
        .unit("unit-c", "hook-c")
        .before("GET", "unit-c")
        .link("unit-a", "unit-b")
        .link("unit-b", "unit-c")
        .build()
        .unwrap();
    let resolved_before = resolve(&store).unwrap();
    assert_eq!(
        resolved_before.chain(ChainSide::Before, "GET"),
        ["hook-a", "hook-b", "hook-c"]
    );

    store.delete_node("unit-b").unwrap();

    let between: Vec<_> = store.outgoing("unit-a").collect();
    assert_eq!(between.len(), 1);
    assert_eq!(between[0].target, "unit-c");
    assert_eq!(between[0].target_handle, UNIT_INPUT);

    let resolved_after = resolve(&store).unwrap();
    assert_eq!(resolved_after.chain(ChainSide::Before, "GET"), ["hook-a", "hook-c"]);

    let changed = diff(&resolved_after, &resolved_before);
    assert_eq!(changed.changed, vec![(ChainSide::Before, "GET".to_string())]);
}

#[test]
fn deleting_an_after_node_keeps_the_tail() {
    let mut store = GraphBuilder::new()
        .unit("c", "hook-c")
        .unit("d", "hook-d")
        .unit("e", "hook-e")
        .after("PUT", "c")
        .link("c", "d")
        .link("d", "e")
        .build()
        .unwrap();

    store.delete_node("c").unwrap();

    let config = resolve(&store).unwrap();
    assert_eq!(config.chain(ChainSide::After, "PUT"), ["hook-d", "hook-e"]);
}

#[test]
fn cycle_fails_the_whole_resolution() {
    let mut store = GraphBuilder::new()
        .unit("a", "hook-a")
        .unit("b", "hook-b")
        .unit("c", "hook-c")
        .before("GET", "a")
        .link("b", "a")
        .after("POST", "c")
        .build()
        .unwrap();
    let good = resolve(&store).unwrap();

    // a already feeds before:GET; its output also fans out into b
    store.connect(&out("a"), &inp("b")).unwrap();

    match resolve(&store) {
        Err(GraphError::CycleDetected { method, .. }) => assert_eq!(method, "GET"),
        other => panic!("Expected CycleDetected, got {:?}", other),
    }

    // breaking the loop restores resolution
    let loop_edge = store.edges_at(&inp("b")).next().unwrap().id.clone();
    store.disconnect(&loop_edge).unwrap();
    let restored = resolve(&store).unwrap();
    assert!(!differs(&restored, &good));
}

#[test]
fn resolving_twice_is_identical() {
    let store = GraphBuilder::new()
        .unit("a", "hook-a")
        .unit("b", "hook-b")
        .unit("c", "hook-c")
        .before("GET", "a")
        .before("DELETE", "b")
        .link("c", "b")
        .after("PATCH", "c")
        .build()
        .unwrap();

    let first = resolve(&store).unwrap();
    let second = resolve(&store).unwrap();
    assert!(!differs(&first, &second));
    assert_eq!(first, second);
}
