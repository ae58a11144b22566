//! Identity primitives used across the Trellis workspace.

use std::any::TypeId;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Process-wide pool of key names, shared by every scope.
///
/// Keys for the same type, symbolic name, or qualifier share one allocation.
#[derive(Default)]
struct Interner {
    names: HashSet<Arc<str>>,
    types: HashMap<TypeId, Arc<str>>,
}

static INTERNER: LazyLock<Mutex<Interner>> = LazyLock::new(Mutex::default);

impl Interner {
    fn name(&mut self, name: &str) -> Arc<str> {
        if let Some(existing) = self.names.get(name) {
            return Arc::clone(existing);
        }
        let shared: Arc<str> = Arc::from(name);
        let _ = self.names.insert(Arc::clone(&shared));
        shared
    }

    fn type_name(&mut self, id: TypeId, full: &str) -> Arc<str> {
        if let Some(existing) = self.types.get(&id) {
            return Arc::clone(existing);
        }
        let shared = self.name(&short_type_name(full));
        let _ = self.types.insert(id, Arc::clone(&shared));
        shared
    }
}

fn intern(name: &str) -> Arc<str> {
    INTERNER.lock().name(name)
}

/// The type half of a [`ComponentKey`].
///
/// Native identities come from Rust types; symbolic identities come from
/// manifests, where only a type name is known.
#[derive(Clone)]
pub enum TypeIdentity {
    /// A Rust type, identified by its [`TypeId`].
    Native {
        /// Runtime type identifier.
        id: TypeId,
        /// Fully qualified type name as reported by the compiler.
        name: &'static str,
    },
    /// A named type declared outside of Rust code.
    Symbolic(Arc<str>),
}

impl PartialEq for TypeIdentity {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Native { id: a, .. }, Self::Native { id: b, .. }) => a == b,
            (Self::Symbolic(a), Self::Symbolic(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TypeIdentity {}

impl Hash for TypeIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Native { id, .. } => {
                0_u8.hash(state);
                id.hash(state);
            }
            Self::Symbolic(name) => {
                1_u8.hash(state);
                name.hash(state);
            }
        }
    }
}

impl fmt::Debug for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native { name, .. } => write!(f, "Native({name})"),
            Self::Symbolic(name) => write!(f, "Symbolic({name})"),
        }
    }
}

/// Immutable identity of a component: a type plus an optional qualifier.
///
/// Two keys are equal iff both the type identity and the qualifier are
/// equal. An empty qualifier is normalized to "no qualifier".
#[derive(Clone)]
pub struct ComponentKey {
    identity: TypeIdentity,
    name: Arc<str>,
    qualifier: Option<Arc<str>>,
}

impl ComponentKey {
    /// Creates an unqualified key for the Rust type `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        let full = std::any::type_name::<T>();
        let id = TypeId::of::<T>();
        Self {
            identity: TypeIdentity::Native { id, name: full },
            name: INTERNER.lock().type_name(id, full),
            qualifier: None,
        }
    }

    /// Creates an unqualified key for a type known only by name.
    #[must_use]
    pub fn symbolic(name: impl AsRef<str>) -> Self {
        let name = intern(name.as_ref());
        Self {
            identity: TypeIdentity::Symbolic(Arc::clone(&name)),
            name,
            qualifier: None,
        }
    }

    /// Returns a copy of this key carrying the given qualifier.
    #[must_use]
    pub fn named(mut self, qualifier: impl AsRef<str>) -> Self {
        let qualifier = qualifier.as_ref().trim();
        self.qualifier = (!qualifier.is_empty()).then(|| intern(qualifier));
        self
    }

    /// Returns the type identity.
    #[must_use]
    pub const fn identity(&self) -> &TypeIdentity {
        &self.identity
    }

    /// Returns the short type name (module path and `dyn` stripped).
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.name
    }

    /// Returns the qualifier, if any.
    #[must_use]
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Returns `true` if this key identifies the Rust type `T`.
    #[must_use]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        matches!(self.identity, TypeIdentity::Native { id, .. } if id == TypeId::of::<T>())
    }
}

impl PartialEq for ComponentKey {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity && self.qualifier == other.qualifier
    }
}

impl Eq for ComponentKey {}

impl Hash for ComponentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
        self.qualifier.hash(state);
    }
}

impl PartialOrd for ComponentKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComponentKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.qualifier.cmp(&other.qualifier))
            .then_with(|| match (&self.identity, &other.identity) {
                (TypeIdentity::Native { id: a, .. }, TypeIdentity::Native { id: b, .. }) => {
                    a.cmp(b)
                }
                (TypeIdentity::Native { .. }, TypeIdentity::Symbolic(_)) => Ordering::Less,
                (TypeIdentity::Symbolic(_), TypeIdentity::Native { .. }) => Ordering::Greater,
                (TypeIdentity::Symbolic(_), TypeIdentity::Symbolic(_)) => Ordering::Equal,
            })
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}::{qualifier}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl fmt::Debug for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentKey({self})")
    }
}

/// Strips module paths from every path segment of a compiler type name.
///
/// `alloc::sync::Arc<my_app::Greeter>` becomes `Arc<Greeter>` and
/// `dyn my_app::Contract` becomes `Contract`.
fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut path = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            path.push(c);
        } else {
            out.push_str(last_segment(&path));
            path.clear();
            out.push(c);
        }
    }
    out.push_str(last_segment(&path));
    match out.strip_prefix("dyn ") {
        Some(stripped) => stripped.to_string(),
        None => out,
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Which rung of a key's binding hierarchy a requirement asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rung {
    /// The highest-priority binding.
    Highest,
    /// The highest binding strictly below the requester's own rung.
    BelowOwn,
    /// The highest binding whose priority is at most the given value.
    AtMost(i64),
}

/// A requested key together with the rung it should resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Requirement {
    /// Requested key.
    pub key: ComponentKey,
    /// Requested rung.
    pub rung: Rung,
}

impl Requirement {
    /// Requires the highest binding of `key`.
    #[must_use]
    pub const fn of(key: ComponentKey) -> Self {
        Self {
            key,
            rung: Rung::Highest,
        }
    }

    /// Requires the binding directly below the requester's own rung.
    #[must_use]
    pub const fn below_own(key: ComponentKey) -> Self {
        Self {
            key,
            rung: Rung::BelowOwn,
        }
    }

    /// Requires the highest binding with priority at most `ceiling`.
    #[must_use]
    pub const fn at_most(key: ComponentKey, ceiling: i64) -> Self {
        Self {
            key,
            rung: Rung::AtMost(ceiling),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rung {
            Rung::Highest => write!(f, "{}", self.key),
            Rung::BelowOwn => write!(f, "{}@below", self.key),
            Rung::AtMost(ceiling) => write!(f, "{}@{ceiling}", self.key),
        }
    }
}

/// Lifetime of the instances produced for a component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// One instance per owning scope, created on first request.
    Singleton,
    /// A fresh instance on every request.
    #[default]
    Prototype,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => write!(f, "singleton"),
            Self::Prototype => write!(f, "prototype"),
        }
    }
}

/// When a requirement must be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Needed at construction time (constructor argument).
    Immediate,
    /// Satisfied after construction (field or setter injection).
    Delayed,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => write!(f, "immediate"),
            Self::Delayed => write!(f, "delayed"),
        }
    }
}
