//! Fluent builder for hook graphs
//!
//! Drives [`GraphStore`] operations, so a built graph obeys the same port
//! rules as one edited interactively.

use crate::error::{GraphError, Result};
use crate::ports::{after_port, before_port, UNIT_INPUT, UNIT_OUTPUT};
use crate::store::GraphStore;
use crate::types::{MethodSet, PortRef, SERVICE_NODE_ID};

/// Fluent builder for constructing hook graphs
///
/// # Example
///
/// ```
/// use hook_graph::GraphBuilder;
///
/// let store = GraphBuilder::new()
///     .unit("auth", "jwt-auth")
///     .unit("audit", "audit-log")
///     .before("GET", "auth")
///     .link("audit", "auth")
///     .build()
///     .unwrap();
/// assert_eq!(store.edges().len(), 2);
/// ```
pub struct GraphBuilder {
    store: GraphStore,
    error: Option<GraphError>,
    next_x: f64,
}

impl GraphBuilder {
    /// Create a builder using the default method set
    pub fn new() -> Self {
        Self::with_methods(MethodSet::default())
    }

    /// Create a builder for a specific method set
    pub fn with_methods(methods: MethodSet) -> Self {
        Self {
            store: GraphStore::new(methods),
            error: None,
            next_x: 0.0,
        }
    }

    /// Add a unit node
    pub fn unit(mut self, id: &str, hook_type: &str) -> Self {
        self.next_x -= 150.0;
        let position = (self.next_x, 0.0);
        self.apply(|store| store.add_unit_with_id(id, hook_type, position).map(|_| ()))
    }

    /// Connect a unit's output to the service's `before:<method>` input
    pub fn before(self, method: &str, unit: &str) -> Self {
        let target = PortRef::new(SERVICE_NODE_ID, before_port(method));
        self.connect(PortRef::new(unit, UNIT_OUTPUT), target)
    }

    /// Connect the service's `after:<method>` output to a unit's input
    pub fn after(self, method: &str, unit: &str) -> Self {
        let source = PortRef::new(SERVICE_NODE_ID, after_port(method));
        self.connect(source, PortRef::new(unit, UNIT_INPUT))
    }

    /// Connect one unit's output to another unit's input
    pub fn link(self, from: &str, to: &str) -> Self {
        self.connect(PortRef::new(from, UNIT_OUTPUT), PortRef::new(to, UNIT_INPUT))
    }

    /// Connect two arbitrary ports
    pub fn connect(self, source: PortRef, target: PortRef) -> Self {
        self.apply(|store| store.connect(&source, &target).map(|_| ()))
    }

    fn apply(mut self, op: impl FnOnce(&mut GraphStore) -> Result<()>) -> Self {
        if self.error.is_none() {
            if let Err(e) = op(&mut self.store) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Build the graph, returning the first error hit while building
    pub fn build(mut self) -> Result<GraphStore> {
        match self.error {
            Some(e) => Err(e),
            None => {
                self.store.take_changes();
                Ok(self.store)
            }
        }
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
