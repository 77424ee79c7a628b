//! Validation of persisted hook graph records
//!
//! Checks node and edge records loaded from storage against the port
//! model before they are hydrated into a [`GraphStore`](crate::GraphStore).
//! All problems are reported, not just the first.

use std::collections::{HashMap, HashSet};

use crate::ports::{find_port, PortDirection};
use crate::types::{EditorState, MethodSet, SERVICE_NODE_ID};

/// Validation error with location context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Two node records share an id
    DuplicateNode { node_id: String },
    /// Two edge records share an id or all four endpoint fields
    DuplicateEdge { edge_id: String },
    /// More than one service node
    MultipleServiceNodes { count: usize },
    /// A service node does not use the fixed service id
    MisplacedService { node_id: String },
    /// A unit node uses the fixed service id
    ReservedNodeId { node_id: String },
    /// An edge references a non-existent node
    UnknownNode { edge_id: String, node_id: String },
    /// An edge references a port its node does not have
    UnknownPort {
        edge_id: String,
        node_id: String,
        port: String,
    },
    /// An edge leaves an input or enters an output
    WrongDirection { edge_id: String, port: String },
    /// An edge connects a node to itself
    SelfLoop { edge_id: String },
    /// A single-edge port holds more than one edge
    PortOverloaded {
        node_id: String,
        port: String,
        count: usize,
    },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateNode { node_id } => write!(f, "Duplicate node id '{}'", node_id),
            Self::DuplicateEdge { edge_id } => write!(f, "Duplicate edge '{}'", edge_id),
            Self::MultipleServiceNodes { count } => {
                write!(f, "Graph has {} service nodes, expected one", count)
            }
            Self::MisplacedService { node_id } => write!(
                f,
                "Service node '{}' must use the id '{}'",
                node_id, SERVICE_NODE_ID
            ),
            Self::ReservedNodeId { node_id } => {
                write!(f, "Unit node uses the reserved id '{}'", node_id)
            }
            Self::UnknownNode { edge_id, node_id } => {
                write!(f, "Edge '{}' references unknown node '{}'", edge_id, node_id)
            }
            Self::UnknownPort {
                edge_id,
                node_id,
                port,
            } => write!(
                f,
                "Edge '{}' references unknown port '{}' on node '{}'",
                edge_id, port, node_id
            ),
            Self::WrongDirection { edge_id, port } => {
                write!(f, "Edge '{}' uses port '{}' in the wrong direction", edge_id, port)
            }
            Self::SelfLoop { edge_id } => write!(f, "Edge '{}' connects a node to itself", edge_id),
            Self::PortOverloaded {
                node_id,
                port,
                count,
            } => write!(
                f,
                "Port '{}' on node '{}' holds {} edges but accepts one",
                port, node_id, count
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate persisted editor state against the port model
///
/// A state without any service node is accepted; hydration inserts one.
pub fn validate_state(methods: &MethodSet, state: &EditorState) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_nodes(state, &mut errors);
    validate_edges(methods, state, &mut errors);

    errors
}

fn validate_nodes(state: &EditorState, errors: &mut Vec<ValidationError>) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut endpoints: HashSet<(&str, &str, &str, &str)> = HashSet::new();
    let mut service_count = 0;

    for node in &state.nodes {
        if !seen.insert(&node.id) {
            errors.push(ValidationError::DuplicateNode {
                node_id: node.id.clone(),
            });
        }
        if node.is_service() {
            service_count += 1;
            if node.id != SERVICE_NODE_ID {
                errors.push(ValidationError::MisplacedService {
                    node_id: node.id.clone(),
                });
            }
        } else if node.id == SERVICE_NODE_ID {
            errors.push(ValidationError::ReservedNodeId {
                node_id: node.id.clone(),
            });
        }
    }

    if service_count > 1 {
        errors.push(ValidationError::MultipleServiceNodes {
            count: service_count,
        });
    }
}

fn validate_edges(methods: &MethodSet, state: &EditorState, errors: &mut Vec<ValidationError>) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut endpoints: HashSet<(&str, &str, &str, &str)> = HashSet::new();
    // (node, port) -> number of edges on a single-edge port
    let mut occupancy: HashMap<(&str, &str), usize> = HashMap::new();

    for edge in &state.edges {
        let key = (
            edge.source.as_str(),
            edge.source_handle.as_str(),
            edge.target.as_str(),
            edge.target_handle.as_str(),
        );
        let new_id = seen.insert(edge.id.as_str());
        let new_endpoints = endpoints.insert(key);
        if !(new_id && new_endpoints) {
            errors.push(ValidationError::DuplicateEdge {
                edge_id: edge.id.clone(),
            });
        }
        if edge.source == edge.target {
            errors.push(ValidationError::SelfLoop {
                edge_id: edge.id.clone(),
            });
        }

        let endpoints = [
            (&edge.source, &edge.source_handle, PortDirection::Output),
            (&edge.target, &edge.target_handle, PortDirection::Input),
        ];
        for (node_id, port, direction) in endpoints {
            let Some(node) = state.find_node(node_id) else {
                errors.push(ValidationError::UnknownNode {
                    edge_id: edge.id.clone(),
                    node_id: node_id.clone(),
                });
                continue;
            };
            let Some(spec) = find_port(&node.kind, methods, port) else {
                errors.push(ValidationError::UnknownPort {
                    edge_id: edge.id.clone(),
                    node_id: node_id.clone(),
                    port: port.clone(),
                });
                continue;
            };
            if spec.direction != direction {
                errors.push(ValidationError::WrongDirection {
                    edge_id: edge.id.clone(),
                    port: port.clone(),
                });
                continue;
            }
            if spec.is_single() {
                *occupancy.entry((node_id.as_str(), port.as_str())).or_insert(0) += 1;
            }
        }
    }

    let mut overloaded: Vec<_> = occupancy.into_iter().filter(|(_, count)| *count > 1).collect();
    overloaded.sort();
    for ((node_id, port), count) in overloaded {
        errors.push(ValidationError::PortOverloaded {
            node_id: node_id.to_string(),
            port: port.to_string(),
            count,
        });
    }
}
