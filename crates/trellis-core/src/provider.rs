//! Strategies for producing component instances.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use trellis_common::error::BoxError;
use trellis_common::types::{ComponentKey, Requirement, Scope};

use crate::instance::{Instance, Upcast};
use crate::introspection::Introspector;

/// Failures raised while assembling arguments or invoking a provider.
///
/// These are boxed into `ComponentInitialization` errors by the coordinator.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A constructor asked for an argument that was not supplied.
    #[error("missing argument {0}")]
    MissingArgument(Requirement),

    /// A supplied argument was not of the requested type.
    #[error("argument {requirement} is not a {expected}")]
    WrongArgumentType {
        /// The requirement whose instance had the wrong type.
        requirement: Requirement,
        /// The requested Rust type.
        expected: &'static str,
    },

    /// A context-driven provider targets a type with no known shape.
    #[error("no component shape is known for {0}")]
    UnknownComponent(ComponentKey),
}

/// Immediate dependencies handed to a constructor or factory.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: HashMap<Requirement, Instance>,
}

impl Arguments {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies the instance for a requirement.
    pub fn insert(&mut self, requirement: Requirement, instance: Instance) {
        let _ = self.values.insert(requirement, instance);
    }

    /// Returns the raw instance supplied for a requirement.
    #[must_use]
    pub fn instance(&self, requirement: &Requirement) -> Option<&Instance> {
        self.values.get(requirement)
    }

    /// Returns the number of supplied arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no argument was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the highest binding of `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument is missing or of another type.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, BoxError> {
        self.resolve(&Requirement::of(ComponentKey::of::<T>()))
    }

    /// Returns the highest binding of `T` under the given qualifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument is missing or of another type.
    pub fn named<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: &str,
    ) -> Result<Arc<T>, BoxError> {
        self.resolve(&Requirement::of(ComponentKey::of::<T>().named(qualifier)))
    }

    /// Returns the binding of `T` directly below the caller's own rung.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument is missing or of another type.
    pub fn below<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, BoxError> {
        self.resolve(&Requirement::below_own(ComponentKey::of::<T>()))
    }

    /// Returns the highest binding of `T`, or `None` if it was not supplied.
    #[must_use]
    pub fn optional<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.resolve(&Requirement::of(ComponentKey::of::<T>())).ok()
    }

    /// Returns the instance supplied for an arbitrary requirement.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument is missing or of another type.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(
        &self,
        requirement: &Requirement,
    ) -> Result<Arc<T>, BoxError> {
        let instance = self
            .values
            .get(requirement)
            .ok_or_else(|| ProvisionError::MissingArgument(requirement.clone()))?;
        instance.downcast::<T>().ok_or_else(|| {
            ProvisionError::WrongArgumentType {
                requirement: requirement.clone(),
                expected: std::any::type_name::<T>(),
            }
            .into()
        })
    }
}

/// Factory closure shape shared by factory providers.
pub type ProduceFn = Arc<dyn Fn(&Arguments) -> Result<Instance, BoxError> + Send + Sync>;

/// How an instance for a key is produced.
///
/// The coordinator only ever calls [`Provider::produce`]; it never branches
/// on the variant.
#[derive(Clone)]
pub enum Provider {
    /// Construct the target component through its introspected shape.
    ContextDriven {
        /// Concrete component to construct.
        target: ComponentKey,
        /// Conversion from the target to the bound key's view.
        upcast: Option<Upcast>,
    },
    /// Always return the same value.
    FixedInstance {
        /// The shared value.
        instance: Instance,
        /// Short name of the value's type, used in diagnostics.
        implementation: Arc<str>,
    },
    /// Invoke a user-supplied producer.
    Factory {
        /// Arguments the producer needs, all immediate.
        requirements: Vec<Requirement>,
        /// Lifetime of produced instances.
        scope: Scope,
        /// The producer.
        produce: ProduceFn,
        /// Short name of the produced type, used in diagnostics.
        implementation: Arc<str>,
    },
}

impl Provider {
    /// Constructs `target` itself.
    #[must_use]
    pub const fn context_driven(target: ComponentKey) -> Self {
        Self::ContextDriven {
            target,
            upcast: None,
        }
    }

    /// Constructs `target` and exposes it through `upcast`.
    #[must_use]
    pub const fn context_driven_as(target: ComponentKey, upcast: Upcast) -> Self {
        Self::ContextDriven {
            target,
            upcast: Some(upcast),
        }
    }

    /// Always returns `value`.
    #[must_use]
    pub fn fixed<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self::FixedInstance {
            instance: Instance::of(value),
            implementation: ComponentKey::of::<T>().type_name().into(),
        }
    }

    /// Invokes `produce` with the supplied requirements as arguments.
    #[must_use]
    pub fn factory<T, F>(requirements: Vec<Requirement>, scope: Scope, produce: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Arguments) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        Self::Factory {
            requirements,
            scope,
            produce: Arc::new(move |args: &Arguments| produce(args).map(Instance::of)),
            implementation: ComponentKey::of::<T>().type_name().into(),
        }
    }

    /// Produces one instance.
    ///
    /// # Errors
    ///
    /// Returns the provider's own failure, or [`ProvisionError::UnknownComponent`]
    /// when a context-driven target has no shape.
    pub fn produce(
        &self,
        args: &Arguments,
        introspector: &dyn Introspector,
    ) -> Result<Instance, BoxError> {
        match self {
            Self::ContextDriven { target, .. } => introspector
                .introspect(target)
                .ok_or_else(|| ProvisionError::UnknownComponent(target.clone()))?
                .construct(args),
            Self::FixedInstance { instance, .. } => Ok(instance.clone()),
            Self::Factory { produce, .. } => produce(args),
        }
    }

    /// Returns the name shown for this provider in hierarchy diagnostics.
    #[must_use]
    pub fn implementation(&self) -> String {
        match self {
            Self::ContextDriven { target, .. } => target.to_string(),
            Self::FixedInstance { implementation, .. }
            | Self::Factory { implementation, .. } => implementation.to_string(),
        }
    }

    /// Returns `true` if this provider constructs `key` through introspection.
    #[must_use]
    pub fn constructs(&self, key: &ComponentKey) -> bool {
        matches!(self, Self::ContextDriven { target, .. } if target == key)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextDriven { target, upcast } => f
                .debug_struct("ContextDriven")
                .field("target", target)
                .field("upcast", upcast)
                .finish(),
            Self::FixedInstance { implementation, .. } => f
                .debug_struct("FixedInstance")
                .field("implementation", implementation)
                .finish_non_exhaustive(),
            Self::Factory {
                requirements,
                scope,
                implementation,
                ..
            } => f
                .debug_struct("Factory")
                .field("requirements", requirements)
                .field("scope", scope)
                .field("implementation", implementation)
                .finish_non_exhaustive(),
        }
    }
}
