//! Plan execution.
//!
//! Single nodes are built with their immediate dependencies as arguments and
//! then receive their delayed ones. Resolvable cycles get a placeholder per
//! member, are built, are cross-wired with the real instances, and finally
//! have their placeholders retargeted.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use trellis_common::config::TrellisConfig;
use trellis_common::error::{BoxError, Result, TrellisError};
use trellis_common::types::{ComponentKey, DependencyKind, Scope};
use trellis_core::instance::Instance;
use trellis_core::introspection::Introspector;
use trellis_core::placeholder::{Placeholder, PlaceholderFactory};
use trellis_core::provider::Arguments;
use trellis_graph::graph::{DependencyEdge, DependencyGraph, GraphNode};
use trellis_graph::validator::{InstantiationPlan, PlanStep, normalized_chain};

use crate::cache::SingletonCache;

/// Executes instantiation plans against one scope.
pub struct InstantiationCoordinator<'a> {
    graph: &'a DependencyGraph,
    introspector: &'a dyn Introspector,
    placeholders: &'a dyn PlaceholderFactory,
    cache: &'a SingletonCache,
    config: &'a TrellisConfig,
    built: HashMap<NodeIndex, Instance>,
}

impl<'a> InstantiationCoordinator<'a> {
    /// Creates a coordinator for one resolution pass.
    #[must_use]
    pub fn new(
        graph: &'a DependencyGraph,
        introspector: &'a dyn Introspector,
        placeholders: &'a dyn PlaceholderFactory,
        cache: &'a SingletonCache,
        config: &'a TrellisConfig,
    ) -> Self {
        Self {
            graph,
            introspector,
            placeholders,
            cache,
            config,
            built: HashMap::new(),
        }
    }

    /// Runs every step of `plan` in order.
    ///
    /// `plan` must have been computed over the graph this coordinator runs on.
    ///
    /// # Errors
    ///
    /// Returns the first resolution or initialization failure. Steps after
    /// the failing one are not run.
    pub fn execute(&mut self, plan: &InstantiationPlan) -> Result<()> {
        for step in plan.steps() {
            match step {
                PlanStep::Single(idx) => self.build_single(*idx)?,
                PlanStep::Cycle { members, .. } => self.build_cycle(members)?,
            }
        }
        Ok(())
    }

    /// Returns the instance built for `idx` during this pass.
    #[must_use]
    pub fn instance(&self, idx: NodeIndex) -> Option<Instance> {
        self.built.get(&idx).cloned()
    }

    fn build_single(&mut self, idx: NodeIndex) -> Result<()> {
        let node = self.node(idx);
        if let Some(cached) = self.cached(node) {
            let _ = self.built.insert(idx, cached);
            return Ok(());
        }
        self.check_unresolved(idx, node)?;
        let instance = self.produce(idx, node)?;
        let _ = self.built.insert(idx, instance.clone());
        self.inject(idx, node, &instance)?;
        self.publish(idx, node, instance);
        Ok(())
    }

    fn build_cycle(&mut self, members: &[NodeIndex]) -> Result<()> {
        let mut pending: Vec<(NodeIndex, &'a GraphNode, Placeholder)> = Vec::new();
        for &idx in members {
            let node = self.node(idx);
            if let Some(cached) = self.cached(node) {
                let _ = self.built.insert(idx, cached);
                continue;
            }
            self.check_unresolved(idx, node)?;
            pending.push((idx, node, self.placeholders.placeholder(node.key())));
        }
        tracing::debug!(members = members.len(), fresh = pending.len(), "building resolvable cycle");

        for (idx, node, _) in &pending {
            let instance = self.produce(*idx, node)?;
            let _ = self.built.insert(*idx, instance);
        }
        for (idx, node, _) in &pending {
            let instance = self.built_instance(*idx, node.key())?;
            self.inject(*idx, node, &instance)?;
        }
        for (idx, node, placeholder) in pending {
            let instance = self.built_instance(idx, node.key())?;
            if !placeholder.retarget(instance.clone()) {
                tracing::warn!(key = %node.key(), "placeholder was already retargeted");
            }
            self.publish(idx, node, instance);
        }
        Ok(())
    }

    fn node(&self, idx: NodeIndex) -> &'a GraphNode {
        let graph: &'a DependencyGraph = self.graph;
        &graph[idx]
    }

    fn cached(&self, node: &GraphNode) -> Option<Instance> {
        (node.context().scope() == Scope::Singleton)
            .then(|| self.cache.get(node.id()))
            .flatten()
    }

    fn publish(&mut self, idx: NodeIndex, node: &GraphNode, instance: Instance) {
        if node.context().scope() == Scope::Singleton {
            let kept = self.cache.publish(node.id().clone(), instance);
            let _ = self.built.insert(idx, kept);
        }
    }

    fn check_unresolved(&self, idx: NodeIndex, node: &GraphNode) -> Result<()> {
        for unresolved in self.graph.unresolved_for(idx) {
            if self.config.strict {
                return Err(TrellisError::ComponentResolution {
                    key: unresolved.requirement.key.clone(),
                    required_by: Some(node.key().clone()),
                });
            }
            tracing::warn!(
                key = %node.key(),
                requirement = %unresolved.requirement,
                kind = %unresolved.kind,
                "skipping unresolved requirement"
            );
        }
        Ok(())
    }

    fn produce(&self, idx: NodeIndex, node: &GraphNode) -> Result<Instance> {
        let mut args = Arguments::new();
        for (target, edge) in self.graph.outgoing(idx) {
            if edge.kind == DependencyKind::Immediate {
                args.insert(edge.requirement.clone(), self.dependency(target, edge)?);
            }
        }
        tracing::debug!(key = %node.key(), arguments = args.len(), "constructing component");
        node.context()
            .provider()
            .produce(&args, self.introspector)
            .map_err(|source| initialization_error(node.key(), source))
    }

    fn inject(&self, idx: NodeIndex, node: &GraphNode, instance: &Instance) -> Result<()> {
        for (target, edge) in self.graph.outgoing(idx) {
            if edge.kind != DependencyKind::Delayed {
                continue;
            }
            let dependency = self.dependency(target, edge)?;
            for point in node.context().injection_points() {
                if point.requirement() == &edge.requirement {
                    point
                        .apply(instance, &dependency)
                        .map_err(|source| initialization_error(node.key(), source))?;
                }
            }
        }
        Ok(())
    }

    fn dependency(&self, target: NodeIndex, edge: &DependencyEdge) -> Result<Instance> {
        let instance = self.built_instance(target, &edge.requirement.key)?;
        match &edge.upcast {
            None => Ok(instance),
            Some(upcast) => upcast.apply(&instance).ok_or_else(|| TrellisError::TypeMismatch {
                key: edge.requirement.key.clone(),
                expected: upcast.view(),
            }),
        }
    }

    fn built_instance(&self, idx: NodeIndex, key: &ComponentKey) -> Result<Instance> {
        self.built
            .get(&idx)
            .cloned()
            .ok_or_else(|| TrellisError::ComponentResolution {
                key: key.clone(),
                required_by: None,
            })
    }
}

impl std::fmt::Debug for InstantiationCoordinator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstantiationCoordinator")
            .field("built", &self.built.len())
            .finish_non_exhaustive()
    }
}

/// Wraps a provider failure, passing cycle errors from nested resolutions through.
fn initialization_error(key: &ComponentKey, source: BoxError) -> TrellisError {
    match source.downcast::<TrellisError>() {
        Ok(nested) if nested.is_cycle() => *nested,
        Ok(nested) => TrellisError::ComponentInitialization {
            key: key.clone(),
            source: nested,
        },
        Err(source) => TrellisError::ComponentInitialization {
            key: key.clone(),
            source,
        },
    }
}

/// Explains a construction that re-entered itself.
///
/// `node` is the component being constructed again and `stack` the keys
/// under construction, outermost first. The single immediate dependency is
/// blamed if there is exactly one; otherwise the immediate dependency whose
/// own immediate requirements lead back to the component. Only the first
/// cycle found is reported.
#[must_use]
pub fn diagnose_reentry(
    graph: &DependencyGraph,
    node: NodeIndex,
    stack: &[ComponentKey],
) -> TrellisError {
    let key = graph[node].key().clone();
    let immediate: Vec<NodeIndex> = graph
        .outgoing(node)
        .into_iter()
        .filter(|(_, edge)| edge.kind == DependencyKind::Immediate)
        .map(|(target, _)| target)
        .collect();

    let blamed = if let [only] = immediate.as_slice() {
        Some(*only)
    } else {
        immediate.iter().copied().find(|&dependency| {
            graph.outgoing(dependency).iter().any(|(target, edge)| {
                edge.kind == DependencyKind::Immediate && graph[*target].key() == &key
            })
        })
    };

    let Some(blamed) = blamed else {
        return TrellisError::UnresolvableCycle { key };
    };
    let blamed = graph[blamed].key().clone();
    let start = stack.iter().position(|k| k == &key).unwrap_or(stack.len());
    let mut chain: Vec<ComponentKey> = stack[start..].to_vec();
    if chain.is_empty() {
        chain.push(key.clone());
    }
    if !chain.contains(&blamed) {
        chain.push(blamed.clone());
    }
    TrellisError::CyclicComponent {
        requester: key,
        blamed,
        chain: normalized_chain(chain),
    }
}
