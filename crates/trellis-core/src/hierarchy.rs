//! Priority-ordered override registries.
//!
//! A [`BindingHierarchy`] holds every provider registered for one key, one
//! per priority rung. Resolution always walks rungs from the highest
//! priority down; the diagnostic string lists them in ascending order.

use std::collections::BTreeMap;
use std::fmt;

use trellis_common::constants::{DEFAULT_PRIORITY, HIERARCHY_SEPARATOR};
use trellis_common::types::ComponentKey;

use crate::provider::Provider;

/// Ordered providers registered for a single key.
#[derive(Debug, Clone)]
pub struct BindingHierarchy {
    key: ComponentKey,
    providers: BTreeMap<i64, Provider>,
}

impl BindingHierarchy {
    /// Creates an empty hierarchy for `key`.
    #[must_use]
    pub const fn new(key: ComponentKey) -> Self {
        Self {
            key,
            providers: BTreeMap::new(),
        }
    }

    /// Returns the key this hierarchy belongs to.
    #[must_use]
    pub const fn key(&self) -> &ComponentKey {
        &self.key
    }

    /// Registers `provider` at `priority`, returning the provider it replaced.
    pub fn add(&mut self, priority: i64, provider: Provider) -> Option<Provider> {
        tracing::debug!(key = %self.key, priority, implementation = %provider.implementation(), "binding added");
        self.providers.insert(priority, provider)
    }

    /// Registers `provider` at the default rung.
    pub fn add_default(&mut self, provider: Provider) -> Option<Provider> {
        self.add(DEFAULT_PRIORITY, provider)
    }

    /// Returns the provider registered at exactly `priority`.
    #[must_use]
    pub fn get(&self, priority: i64) -> Option<&Provider> {
        self.providers.get(&priority)
    }

    /// Returns the highest-priority provider.
    #[must_use]
    pub fn highest(&self) -> Option<&Provider> {
        self.highest_entry().map(|(_, provider)| provider)
    }

    /// Returns the highest-priority provider with its priority.
    #[must_use]
    pub fn highest_entry(&self) -> Option<(i64, &Provider)> {
        self.providers
            .iter()
            .next_back()
            .map(|(priority, provider)| (*priority, provider))
    }

    /// Returns the highest provider whose priority is strictly below `ceiling`.
    #[must_use]
    pub fn get_below(&self, ceiling: i64) -> Option<&Provider> {
        self.entry_below(ceiling).map(|(_, provider)| provider)
    }

    /// Returns the highest entry whose priority is strictly below `ceiling`.
    #[must_use]
    pub fn entry_below(&self, ceiling: i64) -> Option<(i64, &Provider)> {
        self.providers
            .range(..ceiling)
            .next_back()
            .map(|(priority, provider)| (*priority, provider))
    }

    /// Returns the highest entry whose priority is at most `ceiling`.
    #[must_use]
    pub fn entry_at_most(&self, ceiling: i64) -> Option<(i64, &Provider)> {
        self.providers
            .range(..=ceiling)
            .next_back()
            .map(|(priority, provider)| (*priority, provider))
    }

    /// Returns the highest rung whose provider constructs `target`.
    #[must_use]
    pub fn rung_of(&self, target: &ComponentKey) -> Option<i64> {
        self.iter()
            .find(|(_, provider)| provider.constructs(target))
            .map(|(priority, _)| priority)
    }

    /// Unions two hierarchies by priority.
    ///
    /// On a priority collision the entry of `self` is kept, so
    /// `a.merge(&b)` and `b.merge(&a)` differ when they share a rung.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (priority, provider) in &other.providers {
            let _ = merged
                .providers
                .entry(*priority)
                .or_insert_with(|| provider.clone());
        }
        merged
    }

    /// Returns the number of registered rungs.
    #[must_use]
    pub fn size(&self) -> usize {
        self.providers.len()
    }

    /// Returns `true` if no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Iterates rungs from the highest priority to the lowest.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &Provider)> {
        self.providers
            .iter()
            .rev()
            .map(|(priority, provider)| (*priority, provider))
    }
}

impl fmt::Display for BindingHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .providers
            .iter()
            .map(|(priority, provider)| format!("{priority}: {}", provider.implementation()))
            .collect();
        write!(
            f,
            "Hierarchy[{}]: {}",
            self.key,
            entries.join(HIERARCHY_SEPARATOR)
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    trait Contract: Send + Sync {}
    struct ImplementationA;
    struct ImplementationB;
    struct ImplementationC;

    fn provider_for<T: 'static>() -> Provider {
        Provider::context_driven(ComponentKey::of::<T>())
    }

    fn contract_hierarchy() -> BindingHierarchy {
        let mut hierarchy = BindingHierarchy::new(ComponentKey::of::<dyn Contract>());
        let _ = hierarchy.add(0, provider_for::<ImplementationA>());
        let _ = hierarchy.add(1, provider_for::<ImplementationB>());
        let _ = hierarchy.add(2, provider_for::<ImplementationC>());
        hierarchy
    }

    #[test]
    fn display_lists_ascending_priorities() {
        assert_eq!(
            contract_hierarchy().to_string(),
            "Hierarchy[Contract]: 0: ImplementationA -> 1: ImplementationB -> 2: ImplementationC"
        );
    }

    #[test]
    fn display_includes_qualifier() {
        let mut hierarchy =
            BindingHierarchy::new(ComponentKey::of::<dyn Contract>().named("fast"));
        let _ = hierarchy.add(3, provider_for::<ImplementationA>());
        assert_eq!(
            hierarchy.to_string(),
            "Hierarchy[Contract::fast]: 3: ImplementationA"
        );
    }

    #[test]
    fn iteration_is_descending() {
        let priorities: Vec<i64> = contract_hierarchy().iter().map(|(p, _)| p).collect();
        assert_eq!(priorities, vec![2, 1, 0]);
    }

    #[test]
    fn default_rung_is_minus_one() {
        let mut implicit = BindingHierarchy::new(ComponentKey::of::<dyn Contract>());
        let _ = implicit.add_default(provider_for::<ImplementationA>());
        let mut explicit = BindingHierarchy::new(ComponentKey::of::<dyn Contract>());
        let _ = explicit.add(-1, provider_for::<ImplementationA>());

        assert_eq!(implicit.to_string(), explicit.to_string());
        assert!(implicit.get(-1).is_some());
        assert_eq!(implicit.highest_entry().map(|(p, _)| p), Some(-1));
    }

    #[test]
    fn highest_returns_top_rung() {
        let hierarchy = contract_hierarchy();
        let top = hierarchy.highest().expect("top");
        assert!(top.constructs(&ComponentKey::of::<ImplementationC>()));
    }

    #[test]
    fn get_below_is_strict() {
        let hierarchy = contract_hierarchy();
        let below_two = hierarchy.get_below(2).expect("below 2");
        assert!(below_two.constructs(&ComponentKey::of::<ImplementationB>()));
        assert!(hierarchy.get_below(0).is_none());
        assert_eq!(hierarchy.entry_below(100).map(|(p, _)| p), Some(2));
    }

    #[test]
    fn entry_at_most_includes_the_ceiling() {
        let mut hierarchy = contract_hierarchy();
        assert_eq!(hierarchy.entry_at_most(2).map(|(p, _)| p), Some(2));
        assert_eq!(hierarchy.entry_at_most(1).map(|(p, _)| p), Some(1));
        assert!(hierarchy.entry_at_most(-2).is_none());

        let _ = hierarchy.add(i64::MAX, provider_for::<ImplementationA>());
        assert_eq!(hierarchy.entry_at_most(i64::MAX).map(|(p, _)| p), Some(i64::MAX));
        assert_eq!(hierarchy.entry_below(i64::MAX).map(|(p, _)| p), Some(2));
    }

    #[test]
    fn add_replaces_same_priority() {
        let mut hierarchy = contract_hierarchy();
        let replaced = hierarchy.add(1, provider_for::<ImplementationC>());
        assert!(replaced.is_some());
        assert_eq!(hierarchy.size(), 3);
    }

    #[test]
    fn merge_unions_and_keeps_receiver_on_collision() {
        let mut a = BindingHierarchy::new(ComponentKey::of::<dyn Contract>());
        let _ = a.add(0, provider_for::<ImplementationA>());
        let _ = a.add(1, provider_for::<ImplementationB>());
        let mut b = BindingHierarchy::new(ComponentKey::of::<dyn Contract>());
        let _ = b.add(1, provider_for::<ImplementationC>());
        let _ = b.add(5, Provider::fixed(Arc::new(ImplementationC)));

        let merged = a.merge(&b);
        assert_eq!(merged.size(), 3);
        assert!(
            merged
                .get(1)
                .expect("rung 1")
                .constructs(&ComponentKey::of::<ImplementationB>())
        );

        let reversed = b.merge(&a);
        assert!(
            reversed
                .get(1)
                .expect("rung 1")
                .constructs(&ComponentKey::of::<ImplementationC>())
        );
    }

    #[test]
    fn rung_of_finds_constructing_rung() {
        let hierarchy = contract_hierarchy();
        assert_eq!(hierarchy.rung_of(&ComponentKey::of::<ImplementationB>()), Some(1));
        assert_eq!(hierarchy.rung_of(&ComponentKey::symbolic("Other")), None);
    }

    #[test]
    fn empty_hierarchy_display() {
        let hierarchy = BindingHierarchy::new(ComponentKey::symbolic("Contract"));
        assert!(hierarchy.is_empty());
        assert_eq!(hierarchy.to_string(), "Hierarchy[Contract]: ");
    }
}
