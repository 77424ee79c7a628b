//! Core types for hook graphs
//!
//! These types define the persisted shape of a hook graph: nodes, edges,
//! the editor viewport, and the method set that determines which service
//! ports exist.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// Name of a port on a node (e.g. `in`, `before:GET`)
pub type PortName = String;

/// Opaque reference to a hook type
pub type HookTypeId = String;

/// Fixed id of the single service node
pub const SERVICE_NODE_ID: &str = "service";

/// Methods used when no method set is configured
pub const DEFAULT_METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

/// What a node stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeKind {
    /// The service call-site. Exactly one per graph.
    Service,
    /// One hook instance
    #[serde(rename_all = "camelCase")]
    Unit { hook_type: HookTypeId },
}

impl NodeKind {
    /// Create a unit kind for a hook type
    pub fn unit(hook_type: impl Into<HookTypeId>) -> Self {
        Self::Unit {
            hook_type: hook_type.into(),
        }
    }

    pub fn is_service(&self) -> bool {
        matches!(self, NodeKind::Service)
    }

    /// The hook type of a unit, `None` for the service node
    pub fn hook_type(&self) -> Option<&str> {
        match self {
            NodeKind::Service => None,
            NodeKind::Unit { hook_type } => Some(hook_type),
        }
    }
}

/// A node instance in a hook graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// Service or unit
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Position in the editor (x, y)
    #[serde(default)]
    pub position: (f64, f64),
}

impl GraphNode {
    /// Create the service node at the given position
    pub fn service(position: (f64, f64)) -> Self {
        Self {
            id: SERVICE_NODE_ID.to_string(),
            kind: NodeKind::Service,
            position,
        }
    }

    /// Create a unit node
    pub fn unit(
        id: impl Into<NodeId>,
        hook_type: impl Into<HookTypeId>,
        position: (f64, f64),
    ) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::unit(hook_type),
            position,
        }
    }

    pub fn is_service(&self) -> bool {
        self.kind.is_service()
    }
}

/// An edge connecting two ports
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// Source node ID
    pub source: NodeId,
    /// Source port name
    pub source_handle: PortName,
    /// Target node ID
    pub target: NodeId,
    /// Target port name
    pub target_handle: PortName,
}

impl GraphEdge {
    /// Create an edge whose id is derived from its endpoints
    pub fn new(
        source: impl Into<NodeId>,
        source_handle: impl Into<PortName>,
        target: impl Into<NodeId>,
        target_handle: impl Into<PortName>,
    ) -> Self {
        let source = source.into();
        let source_handle = source_handle.into();
        let target = target.into();
        let target_handle = target_handle.into();
        Self {
            id: edge_id(&source, &source_handle, &target, &target_handle),
            source,
            source_handle,
            target,
            target_handle,
        }
    }

    /// Check if this edge touches a node
    pub fn involves_node(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    /// Check if this edge runs between exactly these two ports
    pub fn connects(&self, source: &PortRef, target: &PortRef) -> bool {
        self.source == source.node
            && self.source_handle == source.port
            && self.target == target.node
            && self.target_handle == target.port
    }

    /// Source endpoint as a port reference
    pub fn source_port(&self) -> PortRef {
        PortRef::new(self.source.clone(), self.source_handle.clone())
    }

    /// Target endpoint as a port reference
    pub fn target_port(&self) -> PortRef {
        PortRef::new(self.target.clone(), self.target_handle.clone())
    }
}

/// Derive the id of the edge between two ports
///
/// `%`, `:` and `>` inside a component are percent-escaped, so distinct
/// endpoints always give distinct ids.
pub fn edge_id(source: &str, source_handle: &str, target: &str, target_handle: &str) -> EdgeId {
    format!(
        "edge:{}:{}->{}:{}",
        escape_id_part(source),
        escape_id_part(source_handle),
        escape_id_part(target),
        escape_id_part(target_handle)
    )
}

fn escape_id_part(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for c in part.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            ':' => escaped.push_str("%3A"),
            '>' => escaped.push_str("%3E"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// A port on a specific node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    pub node: NodeId,
    pub port: PortName,
}

impl PortRef {
    pub fn new(node: impl Into<NodeId>, port: impl Into<PortName>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.port)
    }
}

/// Editor viewport (pan and zoom)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// Persisted editor state: the graph records plus the viewport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}

impl EditorState {
    /// Find a node record by ID
    pub fn find_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// The ordered set of methods that determines the service node's ports
///
/// Names are upper-cased and de-duplicated; the set is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct MethodSet(Vec<String>);

impl MethodSet {
    /// Build a method set from names
    pub fn new<I, S>(methods: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for method in methods {
            let method = method.as_ref().trim().to_ascii_uppercase();
            if method.is_empty() {
                return Err(GraphError::invalid_operation("method names must not be empty"));
            }
            if method.contains(':') {
                return Err(GraphError::invalid_operation(format!(
                    "method name '{}' must not contain ':'",
                    method
                )));
            }
            if !normalized.contains(&method) {
                normalized.push(method);
            }
        }
        if normalized.is_empty() {
            return Err(GraphError::invalid_operation("method set must not be empty"));
        }
        Ok(Self(normalized))
    }

    pub fn contains(&self, method: &str) -> bool {
        self.0.iter().any(|m| m == method)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for MethodSet {
    fn default() -> Self {
        Self(DEFAULT_METHODS.iter().map(|m| m.to_string()).collect())
    }
}

impl TryFrom<Vec<String>> for MethodSet {
    type Error = GraphError;

    fn try_from(value: Vec<String>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<MethodSet> for Vec<String> {
    fn from(value: MethodSet) -> Self {
        value.0
    }
}

/// A single structural or layout change applied to the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "camelCase")]
pub enum GraphChange {
    #[serde(rename_all = "camelCase")]
    NodeAdded { node_id: NodeId },
    #[serde(rename_all = "camelCase")]
    NodeRemoved { node_id: NodeId },
    #[serde(rename_all = "camelCase")]
    NodeMoved { node_id: NodeId },
    EdgeAdded { edge: GraphEdge },
    EdgeRemoved { edge: GraphEdge },
}

impl GraphChange {
    /// Whether this change can affect resolved chains
    pub fn is_structural(&self) -> bool {
        !matches!(self, GraphChange::NodeMoved { .. })
    }
}
