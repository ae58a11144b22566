//! The per-scope application context.
//!
//! An [`ApplicationContext`] owns the binding hierarchies, component registry,
//! and singleton cache of one scope. Nothing is shared between contexts.
//!
//! Every resolution builds a fresh dependency graph for the requested key,
//! validates it, and executes the resulting plan. Constructions run under a
//! per-scope re-entrant lock so a singleton is built at most once even when
//! several threads request it first; memoized singletons are served without
//! taking the lock.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use petgraph::graph::NodeIndex;
use trellis_common::config::TrellisConfig;
use trellis_common::constants::DEFAULT_PRIORITY;
use trellis_common::error::{Result, TrellisError};
use trellis_common::types::{ComponentKey, Requirement, Scope};
use trellis_core::component::Component;
use trellis_core::hierarchy::BindingHierarchy;
use trellis_core::instance::{Instance, Upcast};
use trellis_core::introspection::{ComponentRegistry, ComponentShape};
use trellis_core::placeholder::{ForwardingPlaceholders, PlaceholderFactory};
use trellis_core::provider::Provider;
use trellis_graph::context::{DependencyContext, Origin};
use trellis_graph::graph::{DependencyGraph, GraphBuilder, NodeId};
use trellis_graph::resolver::DependencyResolver;
use trellis_graph::validator::CyclicDependencyValidator;

use crate::binder::BindingBuilder;
use crate::bindings::BindingTable;
use crate::cache::SingletonCache;
use crate::coordinator::{InstantiationCoordinator, diagnose_reentry};

type ConstructionStack = RefCell<Vec<ComponentKey>>;

/// Resolution state of one scope.
pub struct ApplicationContext {
    registry: ComponentRegistry,
    bindings: BindingTable,
    cache: SingletonCache,
    placeholders: Arc<dyn PlaceholderFactory>,
    construction: ReentrantMutex<ConstructionStack>,
    sealed: AtomicBool,
    entries: DashMap<Requirement, (NodeId, Option<Upcast>)>,
    config: TrellisConfig,
}

impl ApplicationContext {
    /// Creates a strict context with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(TrellisConfig::default())
    }

    /// Creates a context with the given settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_config(config: TrellisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: TrellisConfig) -> Self {
        Self {
            registry: ComponentRegistry::new(),
            bindings: BindingTable::new(),
            cache: SingletonCache::new(),
            placeholders: Arc::new(ForwardingPlaceholders),
            construction: ReentrantMutex::new(RefCell::new(Vec::new())),
            sealed: AtomicBool::new(false),
            entries: DashMap::new(),
            config,
        }
    }

    /// Replaces the placeholder factory used for resolvable cycles.
    #[must_use]
    pub fn with_placeholders(mut self, placeholders: Arc<dyn PlaceholderFactory>) -> Self {
        self.placeholders = placeholders;
        self
    }

    /// Returns the settings of this scope.
    #[must_use]
    pub const fn config(&self) -> &TrellisConfig {
        &self.config
    }

    /// Returns the component registry.
    #[must_use]
    pub const fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Returns the binding table.
    #[must_use]
    pub const fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    /// Returns `true` once the first resolution has happened.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Registers the component `C`, returning its key.
    pub fn register<C: Component>(&self) -> ComponentKey {
        self.note_change("component registered");
        self.registry.register::<C>()
    }

    /// Registers a component shape.
    pub fn register_shape(&self, shape: ComponentShape) {
        self.note_change("component registered");
        self.registry.register_shape(shape);
    }

    /// Starts a binding for the key `K`.
    pub fn bind<K: ?Sized + Send + Sync + 'static>(&self) -> BindingBuilder<'_, K> {
        BindingBuilder::new(self)
    }

    /// Registers `provider` for `key` at `priority`, returning the provider it replaced.
    pub fn add_binding(&self, key: ComponentKey, priority: i64, provider: Provider) -> Option<Provider> {
        self.note_change("binding added");
        self.bindings.add(key, priority, provider)
    }

    /// Returns a copy of the binding hierarchy for `key`.
    #[must_use]
    pub fn hierarchy(&self, key: &ComponentKey) -> Option<BindingHierarchy> {
        self.bindings.hierarchy(key)
    }

    /// Merges `hierarchy` into this scope; rungs already bound here win.
    pub fn merge_hierarchy(&self, hierarchy: &BindingHierarchy) {
        self.note_change("hierarchy merged");
        self.bindings.merge(hierarchy);
    }

    /// Resolves the highest binding of `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if `T` has no declaration and no binding, if a fatal
    /// cycle is found, or if a provider fails.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.get_as(&Requirement::of(ComponentKey::of::<T>()))
    }

    /// Resolves the highest binding of `T` under `qualifier`.
    ///
    /// # Errors
    ///
    /// See [`Self::get`].
    pub fn get_named<T: ?Sized + Send + Sync + 'static>(&self, qualifier: &str) -> Result<Arc<T>> {
        self.get_as(&Requirement::of(ComponentKey::of::<T>().named(qualifier)))
    }

    fn get_as<T: ?Sized + Send + Sync + 'static>(&self, requirement: &Requirement) -> Result<Arc<T>> {
        self.get_requirement(requirement)?
            .downcast::<T>()
            .ok_or_else(|| TrellisError::TypeMismatch {
                key: requirement.key.clone(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Resolves an arbitrary requirement to a type-erased instance.
    ///
    /// # Errors
    ///
    /// See [`Self::get`]. A construction that re-enters itself is reported
    /// as a cycle.
    pub fn get_requirement(&self, requirement: &Requirement) -> Result<Instance> {
        if !self.sealed.swap(true, Ordering::AcqRel) {
            tracing::info!(
                components = self.registry.len(),
                bindings = self.bindings.len(),
                "configuration sealed"
            );
        }
        if let Some(instance) = self.memoized(requirement) {
            return Ok(instance);
        }

        let stack = self.construction.lock();
        if let Some(instance) = self.memoized(requirement) {
            return Ok(instance);
        }
        let reentered = {
            let keys = stack.borrow();
            keys.contains(&requirement.key) || keys.len() >= self.config.max_construction_depth
        };
        if reentered {
            let keys = stack.borrow().clone();
            return Err(self.diagnose(requirement, &keys));
        }
        let _frame = Frame::enter(&stack, requirement.key.clone());
        self.resolve(requirement)
    }

    /// Builds the dependency graph of every registered component and bound key.
    #[must_use]
    pub fn scope_graph(&self) -> DependencyGraph {
        let builder = GraphBuilder::new(&self.bindings, &self.registry);
        let resolver = DependencyResolver::new(&self.registry);
        let contexts: Vec<DependencyContext> = self
            .registry
            .shapes()
            .iter()
            .map(|shape| resolver.resolve(shape, Origin::Declared, DEFAULT_PRIORITY))
            .collect();
        let mut graph = builder.build(contexts);
        for key in self.bindings.keys() {
            let _ = builder.attach(&mut graph, &Requirement::of(key));
        }
        graph
    }

    /// Validates the graph of every registered component and binding.
    ///
    /// # Errors
    ///
    /// Returns the first fatal cycle, or in strict mode the first unresolved
    /// requirement.
    pub fn validate(&self) -> Result<()> {
        let graph = self.scope_graph();
        let entries: Vec<NodeIndex> = graph.node_indices().collect();
        let plan = CyclicDependencyValidator::new(&graph).plan(&entries)?;
        if self.config.strict {
            if let Some(unresolved) = graph.unresolved().first() {
                return Err(TrellisError::ComponentResolution {
                    key: unresolved.requirement.key.clone(),
                    required_by: Some(graph[unresolved.requester].key().clone()),
                });
            }
        }
        tracing::info!(nodes = graph.node_count(), steps = plan.len(), "scope validated");
        Ok(())
    }

    fn resolve(&self, requirement: &Requirement) -> Result<Instance> {
        let builder = GraphBuilder::new(&self.bindings, &self.registry);
        let mut graph = builder.build(Vec::new());
        let target = builder
            .attach(&mut graph, requirement)
            .ok_or_else(|| TrellisError::ComponentResolution {
                key: requirement.key.clone(),
                required_by: None,
            })?;

        let plan = CyclicDependencyValidator::new(&graph).plan(&[target.node])?;
        let mut coordinator = InstantiationCoordinator::new(
            &graph,
            &self.registry,
            self.placeholders.as_ref(),
            &self.cache,
            &self.config,
        );
        coordinator.execute(&plan)?;
        tracing::debug!(
            requirement = %requirement,
            nodes = graph.node_count(),
            steps = plan.len(),
            "resolution pass complete"
        );

        let instance = coordinator
            .instance(target.node)
            .ok_or_else(|| TrellisError::ComponentResolution {
                key: requirement.key.clone(),
                required_by: None,
            })?;
        if let Some(node) = graph.node(target.node) {
            if node.context().scope() == Scope::Singleton {
                let _ = self
                    .entries
                    .insert(requirement.clone(), (node.id().clone(), target.upcast.clone()));
            }
        }
        view(requirement, instance, target.upcast.as_ref())
    }

    fn memoized(&self, requirement: &Requirement) -> Option<Instance> {
        let entry = self.entries.get(requirement)?;
        let (id, upcast) = entry.value();
        let instance = self.cache.get(id)?;
        view(requirement, instance, upcast.as_ref()).ok()
    }

    fn diagnose(&self, requirement: &Requirement, stack: &[ComponentKey]) -> TrellisError {
        tracing::debug!(requirement = %requirement, depth = stack.len(), "construction re-entered");
        let builder = GraphBuilder::new(&self.bindings, &self.registry);
        let mut graph = builder.build(Vec::new());
        builder.attach(&mut graph, requirement).map_or_else(
            || TrellisError::UnresolvableCycle {
                key: requirement.key.clone(),
            },
            |target| diagnose_reentry(&graph, target.node, stack),
        )
    }

    fn note_change(&self, what: &str) {
        if self.is_sealed() {
            tracing::warn!(change = what, "configuration changed after first resolution");
            self.entries.clear();
        }
    }
}

impl Default for ApplicationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("components", &self.registry.len())
            .field("bindings", &self.bindings.len())
            .field("singletons", &self.cache.len())
            .field("sealed", &self.is_sealed())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn view(requirement: &Requirement, instance: Instance, upcast: Option<&Upcast>) -> Result<Instance> {
    match upcast {
        None => Ok(instance),
        Some(upcast) => upcast
            .apply(&instance)
            .ok_or_else(|| TrellisError::TypeMismatch {
                key: requirement.key.clone(),
                expected: upcast.view(),
            }),
    }
}

/// Marks a key as under construction until dropped.
struct Frame<'a> {
    stack: &'a ConstructionStack,
}

impl<'a> Frame<'a> {
    fn enter(stack: &'a ConstructionStack, key: ComponentKey) -> Self {
        stack.borrow_mut().push(key);
        Self { stack }
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        let _ = self.stack.borrow_mut().pop();
    }
}
