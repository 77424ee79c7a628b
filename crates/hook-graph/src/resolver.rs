//! Chain resolution
//!
//! Walks the graph outward from the service node's per-method ports and
//! compiles the hook chains for every method.
//!
//! The before chain starts at the edge entering `before:<M>` and walks
//! backwards through unit inputs; it is reported farthest-first, so the
//! unit adjacent to the service runs last before the call. The after chain
//! starts at the edge leaving `after:<M>` and walks forwards through unit
//! outputs; it is reported closest-first.
//!
//! Both walks are lazy iterators that track visited edges and nodes and
//! yield [`GraphError::CycleDetected`] instead of looping. A cycle in any
//! method aborts the whole resolution.

use std::collections::HashSet;

use log::debug;

use crate::chain::HookChainConfig;
use crate::error::{GraphError, Result};
use crate::ports::{after_port, before_port, ChainSide, UNIT_INPUT, UNIT_OUTPUT};
use crate::store::GraphStore;
use crate::types::{EdgeId, GraphEdge, HookTypeId, NodeId, SERVICE_NODE_ID};

/// One node reached by a walk, with the edge that reached it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    pub node: NodeId,
    pub hook_type: HookTypeId,
    pub edge: EdgeId,
}

/// Shared cycle bookkeeping for both walk directions
struct Walk<'a> {
    store: &'a GraphStore,
    method: String,
    next: Option<&'a GraphEdge>,
    visited_edges: HashSet<&'a str>,
    visited_nodes: HashSet<&'a str>,
    done: bool,
}

impl<'a> Walk<'a> {
    fn new(store: &'a GraphStore, method: &str, first: Option<&'a GraphEdge>) -> Self {
        Self {
            store,
            method: method.to_string(),
            next: first,
            visited_edges: HashSet::new(),
            visited_nodes: HashSet::new(),
            done: false,
        }
    }

    /// Visit the node on the far side of `edge`, picking the following edge
    /// with `follow`.
    fn step(
        &mut self,
        reached: impl Fn(&'a GraphEdge) -> &'a str,
        follow: impl Fn(&'a GraphStore, &'a str) -> Option<&'a GraphEdge>,
    ) -> Option<Result<ChainStep>> {
        if self.done {
            return None;
        }
        let Some(edge) = self.next.take() else {
            self.done = true;
            return None;
        };
        let node_id = reached(edge);

        if !self.visited_edges.insert(edge.id.as_str()) || !self.visited_nodes.insert(node_id) {
            self.done = true;
            return Some(Err(GraphError::CycleDetected {
                method: self.method.clone(),
                node: node_id.to_string(),
            }));
        }

        let hook_type = match self.store.node(node_id).and_then(|n| n.kind.hook_type()) {
            Some(hook_type) => hook_type.to_string(),
            None => {
                self.done = true;
                return None;
            }
        };

        self.next = follow(self.store, node_id);
        Some(Ok(ChainStep {
            node: node_id.to_string(),
            hook_type,
            edge: edge.id.clone(),
        }))
    }
}

/// Walk from `before:<M>` towards the start of the before chain
///
/// Yields closest-to-service first.
pub struct Ancestors<'a> {
    walk: Walk<'a>,
}

impl<'a> Ancestors<'a> {
    pub fn new(store: &'a GraphStore, method: &str) -> Self {
        let port = before_port(method);
        let first = store
            .incoming(SERVICE_NODE_ID)
            .find(|e| e.target_handle == port);
        Self {
            walk: Walk::new(store, method, first),
        }
    }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = Result<ChainStep>;

    fn next(&mut self) -> Option<Self::Item> {
        self.walk.step(
            |edge| edge.source.as_str(),
            |store, node| {
                store.edges().iter().find(|e| {
                    e.target == node && e.target_handle == UNIT_INPUT && e.source != SERVICE_NODE_ID
                })
            },
        )
    }
}

impl std::iter::FusedIterator for Ancestors<'_> {}

/// Walk from `after:<M>` towards the end of the after chain
///
/// Yields closest-to-service first. At a fan-out the first outgoing edge
/// in insertion order is followed.
pub struct Descendants<'a> {
    walk: Walk<'a>,
}

impl<'a> Descendants<'a> {
    pub fn new(store: &'a GraphStore, method: &str) -> Self {
        let port = after_port(method);
        let first = store
            .outgoing(SERVICE_NODE_ID)
            .find(|e| e.source_handle == port);
        Self {
            walk: Walk::new(store, method, first),
        }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = Result<ChainStep>;

    fn next(&mut self) -> Option<Self::Item> {
        self.walk.step(
            |edge| edge.target.as_str(),
            |store, node| {
                let mut candidates = store.edges().iter().filter(|e| {
                    e.source == node
                        && e.source_handle == UNIT_OUTPUT
                        && e.target != SERVICE_NODE_ID
                });
                let first = candidates.next();
                let skipped = candidates.count();
                if skipped > 0 {
                    debug!(
                        "Node '{}' fans out to {} more units, following the first",
                        node, skipped
                    );
                }
                first
            },
        )
    }
}

impl std::iter::FusedIterator for Descendants<'_> {}

/// Resolve the before chain for one method, farthest-from-service first
pub fn resolve_before(store: &GraphStore, method: &str) -> Result<Vec<HookTypeId>> {
    let mut hooks = Ancestors::new(store, method)
        .map(|step| step.map(|s| s.hook_type))
        .collect::<Result<Vec<_>>>()?;
    hooks.reverse();
    Ok(hooks)
}

/// Resolve the after chain for one method, closest-to-service first
pub fn resolve_after(store: &GraphStore, method: &str) -> Result<Vec<HookTypeId>> {
    Descendants::new(store, method)
        .map(|step| step.map(|s| s.hook_type))
        .collect()
}

/// Resolve both chains for every method of the store
///
/// Fails as a whole if any chain contains a cycle.
pub fn resolve(store: &GraphStore) -> Result<HookChainConfig> {
    let mut config = HookChainConfig::default();
    for method in store.methods().iter() {
        config.set_chain(ChainSide::Before, method, resolve_before(store, method)?);
        config.set_chain(ChainSide::After, method, resolve_after(store, method)?);
    }
    debug!(
        "Resolved {} hooks across {} methods",
        config.hook_count(),
        store.methods().len()
    );
    Ok(config)
}
