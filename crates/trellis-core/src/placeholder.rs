//! Forwarding placeholders for resolvable cycles.
//!
//! While the members of a delayed-only cycle are being built, each member is
//! represented by a [`Placeholder`]. Once every real instance exists the
//! coordinator retargets the placeholders; a placeholder is assigned exactly
//! once.
//!
//! Placeholders are created before any member is constructed, so a
//! [`PlaceholderFactory`] can hand them out as early references. Clones share
//! the target and start forwarding once the cycle is wired.

use std::fmt;
use std::sync::{Arc, OnceLock};

use trellis_common::types::ComponentKey;

use crate::instance::Instance;

/// A cell that forwards to a real instance once retargeted.
#[derive(Clone)]
pub struct Placeholder {
    key: ComponentKey,
    target: Arc<OnceLock<Instance>>,
}

impl Placeholder {
    /// Creates an unbound placeholder for `key`.
    #[must_use]
    pub fn new(key: ComponentKey) -> Self {
        Self {
            key,
            target: Arc::new(OnceLock::new()),
        }
    }

    /// Returns the key this placeholder stands in for.
    #[must_use]
    pub const fn key(&self) -> &ComponentKey {
        &self.key
    }

    /// Points the placeholder at its real instance.
    ///
    /// Returns `false` if it was already retargeted; the first target stays.
    pub fn retarget(&self, instance: Instance) -> bool {
        self.target.set(instance).is_ok()
    }

    /// Returns the real instance, if retargeted.
    #[must_use]
    pub fn target(&self) -> Option<Instance> {
        self.target.get().cloned()
    }

    /// Returns the real instance as an `Arc<T>`, if retargeted and of that type.
    #[must_use]
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.target.get().and_then(Instance::downcast::<T>)
    }

    /// Returns `true` once retargeted.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.target.get().is_some()
    }
}

impl fmt::Debug for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Placeholder")
            .field("key", &self.key)
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Creates placeholders for members of resolvable cycles.
pub trait PlaceholderFactory: Send + Sync {
    /// Returns a fresh placeholder for `key`.
    fn placeholder(&self, key: &ComponentKey) -> Placeholder;
}

/// Default factory producing plain forwarding cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForwardingPlaceholders;

impl PlaceholderFactory for ForwardingPlaceholders {
    fn placeholder(&self, key: &ComponentKey) -> Placeholder {
        Placeholder::new(key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_assigned_once() {
        let placeholder = ForwardingPlaceholders.placeholder(&ComponentKey::symbolic("A"));
        assert!(!placeholder.is_bound());

        let first = Instance::of(Arc::new(1_u32));
        assert!(placeholder.retarget(first.clone()));
        assert!(!placeholder.retarget(Instance::of(Arc::new(2_u32))));

        let target = placeholder.target().expect("bound");
        assert!(target.same_as(&first));
        assert_eq!(placeholder.resolve::<u32>().as_deref(), Some(&1));
    }

    #[test]
    fn clones_share_the_target() {
        let placeholder = Placeholder::new(ComponentKey::symbolic("A"));
        let copy = placeholder.clone();
        let _ = placeholder.retarget(Instance::of(Arc::new("real")));
        assert!(copy.is_bound());
    }
}
