//! Classification of component shapes into dependency contexts.
//!
//! Constructor arguments become immediate requirements and injection points
//! become delayed ones. Nothing is resolved against bindings here.

use trellis_common::types::{ComponentKey, DependencyKind, Scope};
use trellis_core::introspection::{ComponentShape, Introspector};
use trellis_core::provider::Provider;

use crate::context::{DependencyContext, DependencyMap, Origin};

/// Derives [`DependencyContext`]s from introspected shapes and bindings.
#[derive(Clone, Copy)]
pub struct DependencyResolver<'a> {
    introspector: &'a dyn Introspector,
}

impl<'a> DependencyResolver<'a> {
    /// Creates a resolver backed by `introspector`.
    #[must_use]
    pub const fn new(introspector: &'a dyn Introspector) -> Self {
        Self { introspector }
    }

    /// Returns the introspection seam this resolver reads from.
    #[must_use]
    pub const fn introspector(&self) -> &'a dyn Introspector {
        self.introspector
    }

    /// Classifies a component shape.
    #[must_use]
    pub fn resolve(&self, shape: &ComponentShape, origin: Origin, priority: i64) -> DependencyContext {
        let mut dependencies = DependencyMap::new();
        for (kind, requirement) in shape.requirements() {
            let _ = dependencies.insert(kind, requirement.clone());
        }
        DependencyContext::new(
            shape.key().clone(),
            origin,
            priority,
            shape.scope(),
            Provider::context_driven(shape.key().clone()),
        )
        .with_dependencies(dependencies)
        .with_injection_points(shape.injection_points().to_vec())
    }

    /// Introspects `key` and classifies its shape.
    ///
    /// Returns `None` when the introspector knows no such component.
    #[must_use]
    pub fn resolve_key(
        &self,
        key: &ComponentKey,
        origin: Origin,
        priority: i64,
    ) -> Option<DependencyContext> {
        self.introspector
            .introspect(key)
            .map(|shape| self.resolve(&shape, origin, priority))
    }

    /// Classifies a binding registered for `key` at `priority`.
    ///
    /// Fixed instances need nothing and live as long as the scope; factory
    /// arguments are all immediate. A context-driven binding is classified
    /// from its target's shape.
    #[must_use]
    pub fn resolve_binding(
        &self,
        key: &ComponentKey,
        priority: i64,
        provider: &Provider,
    ) -> Option<DependencyContext> {
        match provider {
            Provider::ContextDriven { target, .. } => {
                self.resolve_key(target, Origin::Synthesized, priority)
            }
            Provider::FixedInstance { .. } => Some(DependencyContext::new(
                key.clone(),
                Origin::Synthesized,
                priority,
                Scope::Singleton,
                provider.clone(),
            )),
            Provider::Factory {
                requirements,
                scope,
                ..
            } => {
                let mut dependencies = DependencyMap::new();
                for requirement in requirements {
                    let _ = dependencies.insert(DependencyKind::Immediate, requirement.clone());
                }
                Some(
                    DependencyContext::new(
                        key.clone(),
                        Origin::Synthesized,
                        priority,
                        *scope,
                        provider.clone(),
                    )
                    .with_dependencies(dependencies),
                )
            }
        }
    }
}

impl std::fmt::Debug for DependencyResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyResolver").finish_non_exhaustive()
    }
}
