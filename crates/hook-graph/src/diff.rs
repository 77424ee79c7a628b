//! Change detection between resolved configurations

use std::collections::BTreeSet;

use crate::chain::HookChainConfig;
use crate::ports::ChainSide;

/// The chains that differ between two configurations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainDiff {
    /// (side, method) pairs whose sequences differ or exist on one side only
    pub changed: Vec<(ChainSide, String)>,
}

impl ChainDiff {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changed.len()
    }
}

impl std::fmt::Display for ChainDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.changed.is_empty() {
            return write!(f, "no changes");
        }
        let parts: Vec<String> = self
            .changed
            .iter()
            .map(|(side, method)| format!("{}:{}", side, method))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Whether two configurations differ
///
/// Hook sequences compare in order; methods compare as a key set.
pub fn differs(current: &HookChainConfig, baseline: &HookChainConfig) -> bool {
    current != baseline
}

/// List the chains that differ between two configurations
pub fn diff(current: &HookChainConfig, baseline: &HookChainConfig) -> ChainDiff {
    let mut changed = Vec::new();
    for side in [ChainSide::Before, ChainSide::After] {
        let ours = current.side(side);
        let theirs = baseline.side(side);
        let methods: BTreeSet<&String> = ours.keys().chain(theirs.keys()).collect();
        for method in methods {
            if ours.get(method) != theirs.get(method) {
                changed.push((side, method.clone()));
            }
        }
    }
    ChainDiff { changed }
}
