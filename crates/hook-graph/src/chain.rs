//! Resolved hook chains
//!
//! `HookChainConfig` is the output of chain resolution: for every method,
//! the hook types to run before the service call and after it. It is
//! derived from the graph and never edited directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ports::ChainSide;
use crate::types::{HookTypeId, MethodSet};

/// Per-method hook chains
///
/// Serializes as `{"before": {"GET": [...]}, "after": {"GET": [...]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookChainConfig {
    #[serde(default)]
    pub before: BTreeMap<String, Vec<HookTypeId>>,
    #[serde(default)]
    pub after: BTreeMap<String, Vec<HookTypeId>>,
}

impl HookChainConfig {
    /// A configuration with an empty chain on both sides of every method
    pub fn empty_for(methods: &MethodSet) -> Self {
        let empty: BTreeMap<String, Vec<HookTypeId>> =
            methods.iter().map(|m| (m.to_string(), Vec::new())).collect();
        Self {
            before: empty.clone(),
            after: empty,
        }
    }

    /// The chain for one side of a method, empty when absent
    pub fn chain(&self, side: ChainSide, method: &str) -> &[HookTypeId] {
        self.side(side).get(method).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace the chain for one side of a method
    pub fn set_chain(
        &mut self,
        side: ChainSide,
        method: impl Into<String>,
        hooks: Vec<HookTypeId>,
    ) {
        let map = match side {
            ChainSide::Before => &mut self.before,
            ChainSide::After => &mut self.after,
        };
        map.insert(method.into(), hooks);
    }

    pub fn side(&self, side: ChainSide) -> &BTreeMap<String, Vec<HookTypeId>> {
        match side {
            ChainSide::Before => &self.before,
            ChainSide::After => &self.after,
        }
    }

    /// Total number of hook entries across all chains
    pub fn hook_count(&self) -> usize {
        self.before.values().chain(self.after.values()).map(Vec::len).sum()
    }
}
