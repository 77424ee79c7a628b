//! Graph store: the mutable set of nodes and edges
//!
//! Every mutation goes through this type so the port arity rules hold
//! after each call:
//!
//! - every input port holds at most one edge
//! - a service output port holds at most one edge
//! - a unit output port may fan out to any number of edges
//!
//! A connection onto an occupied single-edge port evicts the previous edge
//! ("last connection wins"). Deleting a unit rewires its incoming edges
//! straight to its outgoing targets so the chain stays continuous.
//!
//! Applied changes are recorded and can be drained with
//! [`GraphStore::take_changes`].

use log::{debug, warn};

use crate::error::{GraphError, Result};
use crate::ports::{find_port, PortDirection, PortSpec};
use crate::types::{
    EdgeId, EditorState, GraphChange, GraphEdge, GraphNode, HookTypeId, MethodSet, NodeId,
    NodeKind, PortRef, Viewport, SERVICE_NODE_ID,
};
use crate::validation::validate_state;

/// Nodes and edges of a hook graph, kept in insertion order
#[derive(Debug, Clone)]
pub struct GraphStore {
    methods: MethodSet,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    changes: Vec<GraphChange>,
}

impl GraphStore {
    /// Create a store holding only the service node
    pub fn new(methods: MethodSet) -> Self {
        Self {
            methods,
            nodes: vec![GraphNode::service((0.0, 0.0))],
            edges: Vec::new(),
            changes: Vec::new(),
        }
    }

    /// Hydrate a store from persisted records
    ///
    /// A record set without a service node gets one inserted; the records
    /// are then validated against the port model.
    pub fn from_state(methods: MethodSet, state: &EditorState) -> Result<Self> {
        let mut state = state.clone();
        if !state.nodes.iter().any(GraphNode::is_service) {
            debug!("Persisted graph has no service node, inserting one");
            state.nodes.insert(0, GraphNode::service((0.0, 0.0)));
        }

        let errors = validate_state(&methods, &state);
        if !errors.is_empty() {
            return Err(GraphError::InvalidGraph(errors));
        }

        Ok(Self {
            methods,
            nodes: state.nodes,
            edges: state.edges,
            changes: Vec::new(),
        })
    }

    /// Export the records for persistence
    pub fn to_state(&self, viewport: Option<Viewport>) -> EditorState {
        EditorState {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            viewport,
        }
    }

    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Find a node by ID
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find an edge by ID
    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// The service node
    pub fn service(&self) -> Option<&GraphNode> {
        self.node(SERVICE_NODE_ID)
    }

    /// Get edges coming into a node
    pub fn incoming<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    /// Get edges going out of a node
    pub fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// All edges attached to a specific port
    pub fn edges_at<'a>(&'a self, port: &'a PortRef) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| {
            (e.source == port.node && e.source_handle == port.port)
                || (e.target == port.node && e.target_handle == port.port)
        })
    }

    /// Look up the definition of a port, if the node and port exist
    pub fn port_spec(&self, port: &PortRef) -> Option<PortSpec> {
        let node = self.node(&port.node)?;
        find_port(&node.kind, &self.methods, &port.port)
    }

    /// Drain the changes applied since the last call
    pub fn take_changes(&mut self) -> Vec<GraphChange> {
        std::mem::take(&mut self.changes)
    }

    /// Add a unit node with a generated id
    pub fn add_unit(&mut self, hook_type: impl Into<HookTypeId>, position: (f64, f64)) -> NodeId {
        let mut id = format!("unit-{}", uuid::Uuid::new_v4());
        while self.node(&id).is_some() {
            id = format!("unit-{}", uuid::Uuid::new_v4());
        }
        self.insert_node(GraphNode::unit(id.clone(), hook_type, position));
        id
    }

    /// Add a unit node with a caller-chosen id
    pub fn add_unit_with_id(
        &mut self,
        id: impl Into<NodeId>,
        hook_type: impl Into<HookTypeId>,
        position: (f64, f64),
    ) -> Result<NodeId> {
        let id = id.into();
        if id.is_empty() {
            return Err(GraphError::invalid_operation("node id must not be empty"));
        }
        if self.node(&id).is_some() {
            return Err(GraphError::invalid_operation(format!(
                "node '{}' already exists",
                id
            )));
        }
        self.insert_node(GraphNode::unit(id.clone(), hook_type, position));
        Ok(id)
    }

    fn insert_node(&mut self, node: GraphNode) {
        debug!("Added node '{}'", node.id);
        self.changes.push(GraphChange::NodeAdded {
            node_id: node.id.clone(),
        });
        self.nodes.push(node);
    }

    /// Move a node on the canvas
    pub fn move_node(&mut self, id: &str, position: (f64, f64)) -> Result<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| GraphError::not_found(format!("node '{}'", id)))?;
        node.position = position;
        self.changes.push(GraphChange::NodeMoved {
            node_id: id.to_string(),
        });
        Ok(())
    }

    /// Connect an output port to an input port
    ///
    /// Occupied single-edge ports on either end lose their previous edge
    /// before the new one is inserted. Connecting an edge that already
    /// exists leaves the graph unchanged.
    pub fn connect(&mut self, source: &PortRef, target: &PortRef) -> Result<EdgeId> {
        if source.node == target.node {
            return Err(GraphError::invalid_connection(format!(
                "cannot connect node '{}' to itself",
                source.node
            )));
        }
        let source_spec = self.require_port(source, PortDirection::Output)?;
        let target_spec = self.require_port(target, PortDirection::Input)?;

        if let Some(existing) = self.edges.iter().find(|e| e.connects(source, target)) {
            return Ok(existing.id.clone());
        }
        let edge = GraphEdge::new(
            source.node.clone(),
            source.port.clone(),
            target.node.clone(),
            target.port.clone(),
        );

        if target_spec.is_single() {
            self.evict(|e| e.target == target.node && e.target_handle == target.port);
        }
        if source_spec.is_single() {
            self.evict(|e| e.source == source.node && e.source_handle == source.port);
        }

        debug!("Connected {} -> {}", source, target);
        let id = edge.id.clone();
        self.changes.push(GraphChange::EdgeAdded { edge: edge.clone() });
        self.edges.push(edge);
        Ok(id)
    }

    fn require_port(&self, port: &PortRef, direction: PortDirection) -> Result<PortSpec> {
        let node = self.node(&port.node).ok_or_else(|| {
            GraphError::invalid_connection(format!("node '{}' does not exist", port.node))
        })?;
        let spec = find_port(&node.kind, &self.methods, &port.port).ok_or_else(|| {
            GraphError::invalid_connection(format!("port '{}' does not exist", port))
        })?;
        if spec.direction != direction {
            return Err(GraphError::invalid_connection(format!(
                "port '{}' is not an {}",
                port,
                match direction {
                    PortDirection::Input => "input",
                    PortDirection::Output => "output",
                }
            )));
        }
        Ok(spec)
    }

    fn evict(&mut self, occupies: impl Fn(&GraphEdge) -> bool) {
        let (evicted, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.edges).into_iter().partition(|e| occupies(e));
        self.edges = kept;
        for edge in evicted {
            debug!("Evicted edge '{}'", edge.id);
            self.changes.push(GraphChange::EdgeRemoved { edge });
        }
    }

    /// Remove an edge
    pub fn disconnect(&mut self, edge_id: &str) -> Result<GraphEdge> {
        let pos = self
            .edges
            .iter()
            .position(|e| e.id == edge_id)
            .ok_or_else(|| GraphError::not_found(format!("edge '{}'", edge_id)))?;
        let edge = self.edges.remove(pos);
        debug!("Disconnected edge '{}'", edge.id);
        self.changes.push(GraphChange::EdgeRemoved { edge: edge.clone() });
        Ok(edge)
    }

    /// Delete a unit node and rewire its neighbours
    ///
    /// Each incoming edge's source is connected to each outgoing edge's
    /// target. Pairs are processed with incomers ordered by source id and
    /// outgoers by target id; every synthesized edge goes through the
    /// `connect` eviction rule, so when several land on one single-edge
    /// port the last pair processed keeps it.
    pub fn delete_node(&mut self, id: &str) -> Result<GraphNode> {
        if id == SERVICE_NODE_ID {
            return Err(GraphError::invalid_operation("the service node cannot be deleted"));
        }
        let pos = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| GraphError::not_found(format!("node '{}'", id)))?;

        let (incident, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| e.involves_node(id));
        self.edges = kept;

        let mut incomers: Vec<&GraphEdge> = incident.iter().filter(|e| e.target == id).collect();
        let mut outgoers: Vec<&GraphEdge> = incident.iter().filter(|e| e.source == id).collect();
        incomers.sort_by(|a, b| (&a.source, &a.source_handle).cmp(&(&b.source, &b.source_handle)));
        outgoers.sort_by(|a, b| (&a.target, &a.target_handle).cmp(&(&b.target, &b.target_handle)));

        let node = self.nodes.remove(pos);
        for edge in &incident {
            self.changes.push(GraphChange::EdgeRemoved { edge: edge.clone() });
        }
        self.changes.push(GraphChange::NodeRemoved {
            node_id: node.id.clone(),
        });
        debug!(
            "Deleted node '{}' ({} incomers, {} outgoers)",
            node.id,
            incomers.len(),
            outgoers.len()
        );

        for incomer in &incomers {
            for outgoer in &outgoers {
                if incomer.source == outgoer.target {
                    debug!(
                        "Skipping rewire of '{}' onto itself",
                        incomer.source
                    );
                    continue;
                }
                if let Err(e) = self.connect(&incomer.source_port(), &outgoer.target_port()) {
                    warn!(
                        "Could not rewire {} -> {}: {}",
                        incomer.source_port(),
                        outgoer.target_port(),
                        e
                    );
                }
            }
        }

        Ok(node)
    }

    /// Number of unit nodes
    pub fn unit_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Unit { .. }))
            .count()
    }
}
