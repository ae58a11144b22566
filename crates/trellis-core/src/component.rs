//! Component declarations.
//!
//! A type becomes injectable by implementing [`Component`]: `describe`
//! declares what it needs, `construct` builds it from its immediate
//! arguments. Delayed requirements are delivered through injection points,
//! usually into a [`Late`] cell.
//!
//! ```
//! use std::sync::Arc;
//!
//! use trellis_common::error::BoxError;
//! use trellis_core::component::{Component, Late, ShapeBuilder};
//! use trellis_core::provider::Arguments;
//!
//! struct Repository;
//!
//! impl Component for Repository {
//!     fn construct(_: &Arguments) -> Result<Self, BoxError> {
//!         Ok(Self)
//!     }
//! }
//!
//! struct Service {
//!     repository: Arc<Repository>,
//!     audit: Late<Repository>,
//! }
//!
//! impl Component for Service {
//!     fn describe(shape: &mut ShapeBuilder<Self>) {
//!         shape
//!             .singleton()
//!             .requires::<Repository>()
//!             .inject::<Repository>(|this, dep| this.audit.set(dep));
//!     }
//!
//!     fn construct(args: &Arguments) -> Result<Self, BoxError> {
//!         Ok(Self {
//!             repository: args.get()?,
//!             audit: Late::new(),
//!         })
//!     }
//! }
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use trellis_common::error::BoxError;
use trellis_common::types::{ComponentKey, Requirement, Scope};

use crate::instance::Instance;
use crate::introspection::{ComponentShape, ConstructFn, InjectFn, InjectionPoint};
use crate::provider::{Arguments, ProvisionError};

/// A type the engine can construct and inject.
pub trait Component: Send + Sync + Sized + 'static {
    /// Declares scope, constructor requirements, and injection points.
    fn describe(shape: &mut ShapeBuilder<Self>) {
        let _ = shape;
    }

    /// Builds the component from its immediate arguments.
    ///
    /// # Errors
    ///
    /// Any error is wrapped into a `ComponentInitialization` failure.
    fn construct(args: &Arguments) -> Result<Self, BoxError>;
}

/// Collects the shape of a component during [`Component::describe`].
pub struct ShapeBuilder<C> {
    key: ComponentKey,
    scope: Scope,
    constructor: Vec<Requirement>,
    injection_points: Vec<InjectionPoint>,
    _component: PhantomData<fn() -> C>,
}

impl<C: Component> ShapeBuilder<C> {
    pub(crate) fn new() -> Self {
        Self {
            key: ComponentKey::of::<C>(),
            scope: Scope::default(),
            constructor: Vec::new(),
            injection_points: Vec::new(),
            _component: PhantomData,
        }
    }

    /// Sets the scope.
    pub const fn scope(&mut self, scope: Scope) -> &mut Self {
        self.scope = scope;
        self
    }

    /// Marks the component as a singleton within its scope.
    pub const fn singleton(&mut self) -> &mut Self {
        self.scope(Scope::Singleton)
    }

    /// Registers the component under a qualifier.
    pub fn qualified(&mut self, qualifier: &str) -> &mut Self {
        self.key = self.key.clone().named(qualifier);
        self
    }

    /// Requires the highest binding of `T` as a constructor argument.
    pub fn requires<T: ?Sized + 'static>(&mut self) -> &mut Self {
        self.requirement(Requirement::of(ComponentKey::of::<T>()))
    }

    /// Requires a qualified binding of `T` as a constructor argument.
    pub fn requires_named<T: ?Sized + 'static>(&mut self, qualifier: &str) -> &mut Self {
        self.requirement(Requirement::of(ComponentKey::of::<T>().named(qualifier)))
    }

    /// Requires the binding of `T` directly below this component's own rung.
    pub fn requires_below<T: ?Sized + 'static>(&mut self) -> &mut Self {
        self.requirement(Requirement::below_own(ComponentKey::of::<T>()))
    }

    /// Requires the highest binding of `T` with priority at most `ceiling`.
    pub fn requires_at_most<T: ?Sized + 'static>(&mut self, ceiling: i64) -> &mut Self {
        self.requirement(Requirement::at_most(ComponentKey::of::<T>(), ceiling))
    }

    /// Adds an arbitrary constructor requirement.
    pub fn requirement(&mut self, requirement: Requirement) -> &mut Self {
        self.constructor.push(requirement);
        self
    }

    /// Delivers the highest binding of `T` after construction.
    pub fn inject<T>(&mut self, apply: impl Fn(&C, Arc<T>) + Send + Sync + 'static) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.inject_requirement(Requirement::of(ComponentKey::of::<T>()), apply)
    }

    /// Delivers the instance for `requirement` after construction.
    pub fn inject_requirement<T>(
        &mut self,
        requirement: Requirement,
        apply: impl Fn(&C, Arc<T>) + Send + Sync + 'static,
    ) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let point_requirement = requirement.clone();
        let inject: InjectFn = Arc::new(move |target: &Instance, dependency: &Instance| {
            let this = target
                .downcast::<C>()
                .ok_or_else(|| ProvisionError::WrongArgumentType {
                    requirement: point_requirement.clone(),
                    expected: std::any::type_name::<C>(),
                })?;
            let value = dependency
                .downcast::<T>()
                .ok_or_else(|| ProvisionError::WrongArgumentType {
                    requirement: point_requirement.clone(),
                    expected: std::any::type_name::<T>(),
                })?;
            apply(&this, value);
            Ok(())
        });
        self.injection_points
            .push(InjectionPoint::new(requirement, inject));
        self
    }

    pub(crate) fn finish(self) -> ComponentShape {
        let construct: ConstructFn =
            Arc::new(|args: &Arguments| C::construct(args).map(|c| Instance::of(Arc::new(c))));
        ComponentShape::from_parts(
            self.key,
            self.scope,
            self.constructor,
            self.injection_points,
            construct,
        )
    }
}

/// A slot filled once, after construction, by an injection point.
pub struct Late<T: ?Sized> {
    cell: OnceLock<Arc<T>>,
}

impl<T: ?Sized> Late<T> {
    /// Creates an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Fills the slot. Later calls are ignored.
    pub fn set(&self, value: Arc<T>) {
        if self.cell.set(value).is_err() {
            tracing::trace!("late slot already filled, keeping first value");
        }
    }

    /// Returns the injected value, if any.
    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    /// Returns `true` once the slot has been filled.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: ?Sized> Default for Late<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Late<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Late")
            .field("set", &self.is_set())
            .finish()
    }
}
