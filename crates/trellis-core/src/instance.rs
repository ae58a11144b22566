//! Type-erased component instances.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A shareable, type-erased component instance.
///
/// The erased value is always an `Arc<T>`, which lets the same handle carry
/// both concrete types and trait objects (`Arc<dyn Contract>`).
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Instance {
    /// Wraps a shared value.
    #[must_use]
    pub fn of<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns the wrapped value if it was stored as an `Arc<T>`.
    #[must_use]
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }

    /// Returns `true` if both handles share the same erased allocation.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// Returns the Rust type name the instance was wrapped as.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

type CastFn = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

/// Converts an instance of a concrete type into an abstract view.
///
/// Used when a requirement for `dyn Contract` resolves to a node that
/// produces `Arc<Implementation>`.
#[derive(Clone)]
pub struct Upcast {
    view: &'static str,
    cast: CastFn,
}

impl Upcast {
    /// Creates an upcast from `Arc<C>` to `Arc<K>`.
    #[must_use]
    pub fn new<C, K, F>(convert: F) -> Self
    where
        C: Send + Sync + 'static,
        K: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<C>) -> Arc<K> + Send + Sync + 'static,
    {
        Self {
            view: std::any::type_name::<K>(),
            cast: Arc::new(move |instance: &Instance| {
                instance
                    .downcast::<C>()
                    .map(|concrete| Instance::of(convert(concrete)))
            }),
        }
    }

    /// Applies the conversion, returning `None` if the instance is not a `C`.
    #[must_use]
    pub fn apply(&self, instance: &Instance) -> Option<Instance> {
        (self.cast)(instance)
    }

    /// Returns the name of the view type.
    #[must_use]
    pub const fn view(&self) -> &'static str {
        self.view
    }
}

impl fmt::Debug for Upcast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Upcast({})", self.view)
    }
}
