//! Singleton cache of one scope.

use dashmap::DashMap;
use trellis_core::instance::Instance;
use trellis_graph::graph::NodeId;

/// Singleton instances keyed by the node that produced them.
///
/// An entry is never replaced once published.
#[derive(Debug, Default)]
pub struct SingletonCache {
    instances: DashMap<NodeId, Instance>,
}

impl SingletonCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached instance for `id`.
    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<Instance> {
        self.instances.get(id).map(|entry| entry.value().clone())
    }

    /// Publishes `instance` for `id` and returns the cached instance.
    ///
    /// If an instance was already published it is kept and returned.
    pub fn publish(&self, id: NodeId, instance: Instance) -> Instance {
        self.instances.entry(id).or_insert(instance).value().clone()
    }

    /// Returns `true` if `id` has a cached instance.
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.instances.contains_key(id)
    }

    /// Returns the number of cached singletons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
