//! Port model
//!
//! Enumerates the connection points of each node kind and the arity
//! policy of each port. The service node exposes one `before:<METHOD>`
//! input and one `after:<METHOD>` output per method; a unit exposes a
//! single generic `in` and `out`.
//!
//! | port            | direction | policy  |
//! |-----------------|-----------|---------|
//! | `before:<M>`    | input     | single  |
//! | `after:<M>`     | output    | single  |
//! | unit `in`       | input     | single  |
//! | unit `out`      | output    | fan-out |

use serde::{Deserialize, Serialize};

use crate::types::{MethodSet, NodeKind, PortName};

/// Name of a unit's generic input port
pub const UNIT_INPUT: &str = "in";

/// Name of a unit's generic output port
pub const UNIT_OUTPUT: &str = "out";

const BEFORE_PREFIX: &str = "before:";
const AFTER_PREFIX: &str = "after:";

/// Direction of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Input,
    Output,
}

/// How many edges a port may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortPolicy {
    /// At most one edge
    Single,
    /// Any number of edges
    FanOut,
}

/// Which side of the service call a service port sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainSide {
    Before,
    After,
}

impl std::fmt::Display for ChainSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainSide::Before => write!(f, "before"),
            ChainSide::After => write!(f, "after"),
        }
    }
}

/// Definition of a single port on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSpec {
    pub name: PortName,
    pub direction: PortDirection,
    pub policy: PortPolicy,
    /// Method served by a service port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl PortSpec {
    pub fn is_single(&self) -> bool {
        self.policy == PortPolicy::Single
    }

    fn unit_input() -> Self {
        Self {
            name: UNIT_INPUT.to_string(),
            direction: PortDirection::Input,
            policy: PortPolicy::Single,
            method: None,
        }
    }

    fn unit_output() -> Self {
        Self {
            name: UNIT_OUTPUT.to_string(),
            direction: PortDirection::Output,
            policy: PortPolicy::FanOut,
            method: None,
        }
    }

    fn service(side: ChainSide, method: &str) -> Self {
        let direction = match side {
            ChainSide::Before => PortDirection::Input,
            ChainSide::After => PortDirection::Output,
        };
        Self {
            name: service_port(side, method),
            direction,
            policy: PortPolicy::Single,
            method: Some(method.to_string()),
        }
    }
}

/// Name of the service input port for a method
pub fn before_port(method: &str) -> PortName {
    service_port(ChainSide::Before, method)
}

/// Name of the service output port for a method
pub fn after_port(method: &str) -> PortName {
    service_port(ChainSide::After, method)
}

fn service_port(side: ChainSide, method: &str) -> PortName {
    match side {
        ChainSide::Before => format!("{}{}", BEFORE_PREFIX, method),
        ChainSide::After => format!("{}{}", AFTER_PREFIX, method),
    }
}

/// Split a service port name into its side and method
pub fn parse_service_port(name: &str) -> Option<(ChainSide, &str)> {
    if let Some(method) = name.strip_prefix(BEFORE_PREFIX) {
        return (!method.is_empty()).then_some((ChainSide::Before, method));
    }
    if let Some(method) = name.strip_prefix(AFTER_PREFIX) {
        return (!method.is_empty()).then_some((ChainSide::After, method));
    }
    None
}

/// Enumerate all ports of a node kind
pub fn ports_for(kind: &NodeKind, methods: &MethodSet) -> Vec<PortSpec> {
    match kind {
        NodeKind::Unit { .. } => vec![PortSpec::unit_input(), PortSpec::unit_output()],
        NodeKind::Service => methods
            .iter()
            .flat_map(|m| {
                [
                    PortSpec::service(ChainSide::Before, m),
                    PortSpec::service(ChainSide::After, m),
                ]
            })
            .collect(),
    }
}

/// Look up a single port by name
pub fn find_port(kind: &NodeKind, methods: &MethodSet, name: &str) -> Option<PortSpec> {
    match kind {
        NodeKind::Unit { .. } => match name {
            UNIT_INPUT => Some(PortSpec::unit_input()),
            UNIT_OUTPUT => Some(PortSpec::unit_output()),
            _ => None,
        },
        NodeKind::Service => {
            let (side, method) = parse_service_port(name)?;
            methods
                .contains(method)
                .then(|| PortSpec::service(side, method))
        }
    }
}
