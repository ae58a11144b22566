//! Per-scope binding hierarchies.

use dashmap::DashMap;
use trellis_common::types::ComponentKey;
use trellis_core::hierarchy::BindingHierarchy;
use trellis_core::provider::Provider;
use trellis_graph::graph::{BindingSource, Ceiling, select_binding};

/// Every binding hierarchy of one scope, safe for concurrent reads.
#[derive(Debug, Default)]
pub struct BindingTable {
    hierarchies: DashMap<ComponentKey, BindingHierarchy>,
}

impl BindingTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` for `key` at `priority`, returning the provider it replaced.
    pub fn add(&self, key: ComponentKey, priority: i64, provider: Provider) -> Option<Provider> {
        self.hierarchies
            .entry(key.clone())
            .or_insert_with(|| BindingHierarchy::new(key))
            .add(priority, provider)
    }

    /// Returns a copy of the hierarchy for `key`.
    #[must_use]
    pub fn hierarchy(&self, key: &ComponentKey) -> Option<BindingHierarchy> {
        self.hierarchies.get(key).map(|entry| entry.value().clone())
    }

    /// Merges `other` into the hierarchy for its key; existing rungs win.
    pub fn merge(&self, other: &BindingHierarchy) {
        let mut entry = self
            .hierarchies
            .entry(other.key().clone())
            .or_insert_with(|| BindingHierarchy::new(other.key().clone()));
        let merged = entry.merge(other);
        *entry = merged;
    }

    /// Returns every bound key, ordered.
    #[must_use]
    pub fn keys(&self) -> Vec<ComponentKey> {
        let mut keys: Vec<ComponentKey> = self
            .hierarchies
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Returns `true` if `key` has at least one binding.
    #[must_use]
    pub fn contains(&self, key: &ComponentKey) -> bool {
        self.hierarchies
            .get(key)
            .is_some_and(|entry| !entry.is_empty())
    }

    /// Returns the number of bound keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hierarchies.len()
    }

    /// Returns `true` if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hierarchies.is_empty()
    }
}

impl BindingSource for BindingTable {
    fn binding(&self, key: &ComponentKey, ceiling: Ceiling) -> Option<(i64, Provider)> {
        self.hierarchies
            .get(key)
            .and_then(|entry| select_binding(entry.value(), ceiling))
    }

    fn rung_of(&self, key: &ComponentKey, target: &ComponentKey) -> Option<i64> {
        self.hierarchies
            .get(key)
            .and_then(|entry| entry.value().rung_of(target))
    }
}
