//! Fluent binding registration.
//!
//! ```
//! use std::sync::Arc;
//!
//! use trellis_runtime::context::ApplicationContext;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! let context = ApplicationContext::new();
//! context
//!     .bind::<dyn Greeter>()
//!     .priority(5)
//!     .singleton(Arc::new(English));
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use trellis_common::constants::DEFAULT_PRIORITY;
use trellis_common::error::BoxError;
use trellis_common::types::{ComponentKey, Requirement, Scope};
use trellis_core::component::Component;
use trellis_core::instance::Upcast;
use trellis_core::provider::{Arguments, Provider};

use crate::context::ApplicationContext;

/// Registers one binding for the key `K`.
///
/// Nothing is registered until a terminal method (`to`, `to_self`,
/// `singleton`, `to_supplier`, `lazy_singleton`, `to_factory`) is called.
#[must_use = "a binding is only registered by a terminal method"]
pub struct BindingBuilder<'c, K: ?Sized> {
    context: &'c ApplicationContext,
    key: ComponentKey,
    priority: i64,
    _key: PhantomData<fn(Arc<K>)>,
}

impl<'c, K: ?Sized + Send + Sync + 'static> BindingBuilder<'c, K> {
    pub(crate) fn new(context: &'c ApplicationContext) -> Self {
        Self {
            context,
            key: ComponentKey::of::<K>(),
            priority: DEFAULT_PRIORITY,
            _key: PhantomData,
        }
    }

    /// Sets the rung of the binding. Defaults to `-1`.
    pub const fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Binds the qualified key `K::qualifier` instead of `K`.
    pub fn named(mut self, qualifier: &str) -> Self {
        self.key = self.key.named(qualifier);
        self
    }

    /// Binds `K` to the component `C`, viewed through `upcast`.
    ///
    /// `C` is registered with the scope if it was not already.
    pub fn to<C: Component>(self, upcast: impl Fn(Arc<C>) -> Arc<K> + Send + Sync + 'static) {
        let target = self.context.register::<C>();
        let provider = Provider::context_driven_as(target, Upcast::new::<C, K, _>(upcast));
        self.finish(provider);
    }

    /// Binds `K` to a fixed, shared value.
    pub fn singleton(self, value: Arc<K>) {
        self.finish(Provider::fixed(value));
    }

    /// Binds `K` to a supplier invoked on every request.
    pub fn to_supplier(self, supplier: impl Fn() -> Arc<K> + Send + Sync + 'static) {
        self.finish(Provider::factory(Vec::new(), Scope::Prototype, move |_| {
            Ok(supplier())
        }));
    }

    /// Binds `K` to a supplier invoked once, on first request.
    pub fn lazy_singleton(self, supplier: impl Fn() -> Arc<K> + Send + Sync + 'static) {
        self.finish(Provider::factory(Vec::new(), Scope::Singleton, move |_| {
            Ok(supplier())
        }));
    }

    /// Binds `K` to a factory that receives `requirements` as immediate arguments.
    pub fn to_factory<F>(self, requirements: Vec<Requirement>, scope: Scope, factory: F)
    where
        F: Fn(&Arguments) -> Result<Arc<K>, BoxError> + Send + Sync + 'static,
    {
        self.finish(Provider::factory(requirements, scope, factory));
    }

    fn finish(self, provider: Provider) {
        let _ = self.context.add_binding(self.key, self.priority, provider);
    }
}

impl<K: Component> BindingBuilder<'_, K> {
    /// Binds `K` to itself, constructed through its own shape.
    pub fn to_self(self) {
        let target = self.context.register::<K>();
        self.finish(Provider::context_driven(target));
    }
}
