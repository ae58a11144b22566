//! Dependency contexts.

use std::fmt;

use trellis_common::types::{ComponentKey, DependencyKind, Requirement, Scope};
use trellis_core::introspection::InjectionPoint;
use trellis_core::provider::Provider;

/// Where a context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Supplied by the caller or registered with the scope.
    Declared,
    /// Created by the graph builder to stand in for a binding.
    Synthesized,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared => write!(f, "declared"),
            Self::Synthesized => write!(f, "synthesized"),
        }
    }
}

/// Requirements of one component, split by when they are needed.
///
/// The two sets are independent: a requirement listed both as a
/// constructor argument and as an injection point appears in both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyMap {
    immediate: Vec<Requirement>,
    delayed: Vec<Requirement>,
}

impl DependencyMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a requirement to the set for `kind`.
    ///
    /// Returns `false` if it was already present in that set.
    pub fn insert(&mut self, kind: DependencyKind, requirement: Requirement) -> bool {
        let set = match kind {
            DependencyKind::Immediate => &mut self.immediate,
            DependencyKind::Delayed => &mut self.delayed,
        };
        if set.contains(&requirement) {
            return false;
        }
        set.push(requirement);
        true
    }

    /// Returns the requirements of one kind, in declaration order.
    #[must_use]
    pub fn get(&self, kind: DependencyKind) -> &[Requirement] {
        match kind {
            DependencyKind::Immediate => &self.immediate,
            DependencyKind::Delayed => &self.delayed,
        }
    }

    /// Returns `true` if `requirement` is in the set for `kind`.
    #[must_use]
    pub fn contains(&self, kind: DependencyKind, requirement: &Requirement) -> bool {
        self.get(kind).contains(requirement)
    }

    /// Iterates immediate requirements first, then delayed ones.
    pub fn iter(&self) -> impl Iterator<Item = (DependencyKind, &Requirement)> {
        self.immediate
            .iter()
            .map(|r| (DependencyKind::Immediate, r))
            .chain(self.delayed.iter().map(|r| (DependencyKind::Delayed, r)))
    }

    /// Returns the total number of requirements across both sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.immediate.len() + self.delayed.len()
    }

    /// Returns `true` if the component requires nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.immediate.is_empty() && self.delayed.is_empty()
    }
}

/// The resolved declaration of one component.
///
/// Rebuilt on every resolution pass and discarded afterwards.
#[derive(Debug, Clone)]
pub struct DependencyContext {
    key: ComponentKey,
    dependencies: DependencyMap,
    origin: Origin,
    priority: i64,
    scope: Scope,
    provider: Provider,
    injection_points: Vec<InjectionPoint>,
}

impl DependencyContext {
    /// Creates a context with no requirements.
    #[must_use]
    pub const fn new(
        key: ComponentKey,
        origin: Origin,
        priority: i64,
        scope: Scope,
        provider: Provider,
    ) -> Self {
        Self {
            key,
            dependencies: DependencyMap {
                immediate: Vec::new(),
                delayed: Vec::new(),
            },
            origin,
            priority,
            scope,
            provider,
            injection_points: Vec::new(),
        }
    }

    /// Replaces the requirement sets.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: DependencyMap) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Replaces the injection points applied after construction.
    #[must_use]
    pub fn with_injection_points(mut self, injection_points: Vec<InjectionPoint>) -> Self {
        self.injection_points = injection_points;
        self
    }

    /// Returns the component key.
    #[must_use]
    pub const fn key(&self) -> &ComponentKey {
        &self.key
    }

    /// Returns the requirement sets.
    #[must_use]
    pub const fn dependencies(&self) -> &DependencyMap {
        &self.dependencies
    }

    /// Returns where the context came from.
    #[must_use]
    pub const fn origin(&self) -> Origin {
        self.origin
    }

    /// Returns the rung the component occupies in its key's hierarchy.
    #[must_use]
    pub const fn priority(&self) -> i64 {
        self.priority
    }

    /// Returns the scope of produced instances.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the provider that produces the instance.
    #[must_use]
    pub const fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Returns the injection points for delayed requirements.
    #[must_use]
    pub fn injection_points(&self) -> &[InjectionPoint] {
        &self.injection_points
    }
}
