//! The introspection seam.
//!
//! An [`Introspector`] answers "what does this component need?" with a
//! [`ComponentShape`]: constructor requirements (needed immediately) and
//! injection points (satisfied after construction). The default
//! implementation is a [`ComponentRegistry`] filled from
//! [`Component`](crate::component::Component) types or symbolic shapes.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use trellis_common::error::BoxError;
use trellis_common::types::{ComponentKey, DependencyKind, Requirement, Scope};

use crate::component::{Component, ShapeBuilder};
use crate::instance::Instance;
use crate::provider::Arguments;

/// Constructor closure of a component shape.
pub type ConstructFn = Arc<dyn Fn(&Arguments) -> Result<Instance, BoxError> + Send + Sync>;

/// Injection closure: `(target, dependency)`.
pub type InjectFn = Arc<dyn Fn(&Instance, &Instance) -> Result<(), BoxError> + Send + Sync>;

/// A field or setter that receives a dependency after construction.
#[derive(Clone)]
pub struct InjectionPoint {
    requirement: Requirement,
    apply: Option<InjectFn>,
}

impl InjectionPoint {
    /// Creates an injection point that runs `apply`.
    #[must_use]
    pub fn new(requirement: Requirement, apply: InjectFn) -> Self {
        Self {
            requirement,
            apply: Some(apply),
        }
    }

    /// Creates an injection point with no behaviour, for symbolic shapes.
    #[must_use]
    pub const fn symbolic(requirement: Requirement) -> Self {
        Self {
            requirement,
            apply: None,
        }
    }

    /// Returns the requirement this point is filled from.
    #[must_use]
    pub const fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Hands `dependency` to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if either instance has an unexpected type.
    pub fn apply(&self, target: &Instance, dependency: &Instance) -> Result<(), BoxError> {
        self.apply
            .as_ref()
            .map_or(Ok(()), |apply| apply(target, dependency))
    }
}

impl fmt::Debug for InjectionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionPoint")
            .field("requirement", &self.requirement)
            .finish_non_exhaustive()
    }
}

/// Instance produced by a symbolic shape.
///
/// Records the key and which arguments were supplied, so manifests can be
/// instantiated without Rust types behind them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicInstance {
    /// Key of the constructed component.
    pub key: ComponentKey,
    /// Keys of the arguments that were supplied, in declaration order.
    pub arguments: Vec<ComponentKey>,
}

/// The introspected shape of one component.
#[derive(Clone)]
pub struct ComponentShape {
    key: ComponentKey,
    scope: Scope,
    constructor: Vec<Requirement>,
    injection_points: Vec<InjectionPoint>,
    construct: ConstructFn,
}

impl ComponentShape {
    /// Describes a Rust component type.
    #[must_use]
    pub fn of<C: Component>() -> Self {
        let mut builder = ShapeBuilder::<C>::new();
        C::describe(&mut builder);
        builder.finish()
    }

    /// Assembles a shape from parts.
    #[must_use]
    pub fn from_parts(
        key: ComponentKey,
        scope: Scope,
        constructor: Vec<Requirement>,
        injection_points: Vec<InjectionPoint>,
        construct: ConstructFn,
    ) -> Self {
        Self {
            key,
            scope,
            constructor,
            injection_points,
            construct,
        }
    }

    /// Describes a component known only by name.
    ///
    /// Constructing it yields a [`SymbolicInstance`].
    #[must_use]
    pub fn symbolic(
        key: ComponentKey,
        scope: Scope,
        immediate: Vec<Requirement>,
        delayed: Vec<Requirement>,
    ) -> Self {
        let own_key = key.clone();
        let constructor = immediate.clone();
        let construct: ConstructFn = Arc::new(move |args: &Arguments| {
            let arguments = constructor
                .iter()
                .filter(|requirement| args.instance(requirement).is_some())
                .map(|requirement| requirement.key.clone())
                .collect();
            Ok(Instance::of(Arc::new(SymbolicInstance {
                key: own_key.clone(),
                arguments,
            })))
        });
        Self {
            key,
            scope,
            constructor: immediate,
            injection_points: delayed.into_iter().map(InjectionPoint::symbolic).collect(),
            construct,
        }
    }

    /// Returns the component's key.
    #[must_use]
    pub const fn key(&self) -> &ComponentKey {
        &self.key
    }

    /// Returns the declared scope.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the constructor requirements.
    #[must_use]
    pub fn constructor(&self) -> &[Requirement] {
        &self.constructor
    }

    /// Returns the injection points.
    #[must_use]
    pub fn injection_points(&self) -> &[InjectionPoint] {
        &self.injection_points
    }

    /// Iterates every requirement tagged with when it is needed.
    pub fn requirements(&self) -> impl Iterator<Item = (DependencyKind, &Requirement)> {
        self.constructor
            .iter()
            .map(|requirement| (DependencyKind::Immediate, requirement))
            .chain(
                self.injection_points
                    .iter()
                    .map(|point| (DependencyKind::Delayed, point.requirement())),
            )
    }

    /// Runs the constructor.
    ///
    /// # Errors
    ///
    /// Returns whatever the component's constructor returns.
    pub fn construct(&self, args: &Arguments) -> Result<Instance, BoxError> {
        (self.construct)(args)
    }
}

impl fmt::Debug for ComponentShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentShape")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("constructor", &self.constructor)
            .field("injection_points", &self.injection_points)
            .finish_non_exhaustive()
    }
}

/// Looks up the shape of a component.
pub trait Introspector: Send + Sync {
    /// Returns the shape of `key`, or `None` if it is not a known component.
    fn introspect(&self, key: &ComponentKey) -> Option<ComponentShape>;
}

/// Registry of component shapes, the default [`Introspector`].
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    shapes: DashMap<ComponentKey, ComponentShape>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the Rust component `C`, returning its key.
    pub fn register<C: Component>(&self) -> ComponentKey {
        let shape = ComponentShape::of::<C>();
        let key = shape.key().clone();
        self.register_shape(shape);
        key
    }

    /// Registers a shape, replacing any earlier shape for the same key.
    pub fn register_shape(&self, shape: ComponentShape) {
        let key = shape.key().clone();
        if self.shapes.insert(key.clone(), shape).is_some() {
            tracing::debug!(key = %key, "component shape replaced");
        } else {
            tracing::debug!(key = %key, "component registered");
        }
    }

    /// Returns `true` if `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &ComponentKey) -> bool {
        self.shapes.contains_key(key)
    }

    /// Returns the number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Returns every registered shape, ordered by key.
    #[must_use]
    pub fn shapes(&self) -> Vec<ComponentShape> {
        let mut shapes: Vec<ComponentShape> =
            self.shapes.iter().map(|entry| entry.value().clone()).collect();
        shapes.sort_by(|a, b| a.key().cmp(b.key()));
        shapes
    }
}

impl Introspector for ComponentRegistry {
    fn introspect(&self, key: &ComponentKey) -> Option<ComponentShape> {
        self.shapes.get(key).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ComponentKey {
        ComponentKey::symbolic(name)
    }

    #[test]
    fn symbolic_shape_tags_requirements() {
        let shape = ComponentShape::symbolic(
            key("Service"),
            Scope::Singleton,
            vec![Requirement::of(key("Repository"))],
            vec![Requirement::of(key("Audit"))],
        );
        let tagged: Vec<(DependencyKind, String)> = shape
            .requirements()
            .map(|(kind, requirement)| (kind, requirement.to_string()))
            .collect();
        assert_eq!(
            tagged,
            vec![
                (DependencyKind::Immediate, "Repository".to_string()),
                (DependencyKind::Delayed, "Audit".to_string()),
            ]
        );
    }

    #[test]
    fn symbolic_shape_records_supplied_arguments() {
        let repository = Requirement::of(key("Repository"));
        let shape = ComponentShape::symbolic(
            key("Service"),
            Scope::Prototype,
            vec![repository.clone(), Requirement::of(key("Missing"))],
            Vec::new(),
        );
        let mut args = Arguments::new();
        args.insert(repository, Instance::of(Arc::new(0_u8)));
        let instance = shape.construct(&args).expect("construct");
        let symbolic = instance.downcast::<SymbolicInstance>().expect("symbolic");
        assert_eq!(symbolic.key, key("Service"));
        assert_eq!(symbolic.arguments, vec![key("Repository")]);
    }

    #[test]
    fn registry_introspects_registered_shapes() {
        let registry = ComponentRegistry::new();
        registry.register_shape(ComponentShape::symbolic(
            key("B"),
            Scope::Prototype,
            Vec::new(),
            Vec::new(),
        ));
        registry.register_shape(ComponentShape::symbolic(
            key("A"),
            Scope::Prototype,
            Vec::new(),
            Vec::new(),
        ));
        assert!(registry.contains(&key("A")));
        assert!(registry.introspect(&key("C")).is_none());
        let keys: Vec<String> = registry.shapes().iter().map(|s| s.key().to_string()).collect();
        assert_eq!(keys, vec!["A", "B"]);
    }
}
