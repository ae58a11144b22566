//! Dependency graph construction using `petgraph`.
//!
//! Nodes wrap [`DependencyContext`]s and edges point from a requester to the
//! node that satisfies one of its requirements, tagged immediate or delayed.
//! A requirement for a key some other declared component provides is wired
//! straight to that component. Everything else goes through the key's
//! binding hierarchy: a context-driven binding wires to the node of its
//! target component, an instance or factory binding wires to a synthesized
//! binding node. Rung-qualified requirements consult the hierarchy first and
//! fall back to the declared component as the implicit bottom rung.

use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::{Direction, Graph};
use trellis_common::constants::DEFAULT_PRIORITY;
use trellis_common::types::{ComponentKey, DependencyKind, Requirement, Rung};
use trellis_core::hierarchy::BindingHierarchy;
use trellis_core::instance::Upcast;
use trellis_core::introspection::Introspector;
use trellis_core::provider::Provider;

use crate::context::{DependencyContext, Origin};
use crate::resolver::DependencyResolver;

/// Identity of a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    /// A component constructed through its introspected shape.
    Component(ComponentKey),
    /// An instance or factory binding registered for a key at a rung.
    Binding(ComponentKey, i64),
}

impl NodeId {
    /// Returns the key the node produces instances for.
    #[must_use]
    pub const fn key(&self) -> &ComponentKey {
        match self {
            Self::Component(key) | Self::Binding(key, _) => key,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(key) => write!(f, "{key}"),
            Self::Binding(key, priority) => write!(f, "{key}[{priority}]"),
        }
    }
}

/// One node of the dependency graph.
#[derive(Debug, Clone)]
pub struct GraphNode {
    id: NodeId,
    context: DependencyContext,
}

impl GraphNode {
    /// Returns the node identity.
    #[must_use]
    pub const fn id(&self) -> &NodeId {
        &self.id
    }

    /// Returns the wrapped context.
    #[must_use]
    pub const fn context(&self) -> &DependencyContext {
        &self.context
    }

    /// Returns the key of the wrapped context.
    #[must_use]
    pub const fn key(&self) -> &ComponentKey {
        self.context.key()
    }
}

/// An edge from a requester to the node satisfying one requirement.
#[derive(Debug, Clone)]
pub struct DependencyEdge {
    /// When the requirement must be satisfied.
    pub kind: DependencyKind,
    /// The requirement as declared by the requester.
    pub requirement: Requirement,
    /// Conversion from the target's instance to the requested view.
    pub upcast: Option<Upcast>,
}

/// A requirement the builder could not wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    /// Node that declared the requirement.
    pub requester: NodeIndex,
    /// When the requirement was needed.
    pub kind: DependencyKind,
    /// The requirement itself.
    pub requirement: Requirement,
}

/// Where a requirement resolved to.
#[derive(Debug, Clone)]
pub struct Target {
    /// Node producing the instance.
    pub node: NodeIndex,
    /// Conversion applied to the node's instance.
    pub upcast: Option<Upcast>,
}

/// A dependency graph of component contexts.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: Graph<GraphNode, DependencyEdge>,
    index: HashMap<NodeId, NodeIndex>,
    unresolved: Vec<Unresolved>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, or returns the existing node with the same identity.
    ///
    /// The boolean is `true` when a new node was created.
    pub fn add_node(&mut self, id: NodeId, context: DependencyContext) -> (NodeIndex, bool) {
        if let Some(&existing) = self.index.get(&id) {
            return (existing, false);
        }
        let idx = self.graph.add_node(GraphNode {
            id: id.clone(),
            context,
        });
        let _ = self.index.insert(id, idx);
        (idx, true)
    }

    /// Adds an edge from `requester` to `dependency`.
    pub fn add_edge(
        &mut self,
        requester: NodeIndex,
        dependency: NodeIndex,
        edge: DependencyEdge,
    ) -> EdgeIndex {
        self.graph.add_edge(requester, dependency, edge)
    }

    /// Returns the node at `idx`.
    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> Option<&GraphNode> {
        self.graph.node_weight(idx)
    }

    /// Returns the index of the node with identity `id`.
    #[must_use]
    pub fn find(&self, id: &NodeId) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterates every node index in insertion order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    /// Returns the nodes with no outgoing edges.
    #[must_use]
    pub fn roots(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .collect()
    }

    /// Returns the outgoing edges of `idx` in insertion order.
    #[must_use]
    pub fn outgoing(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DependencyEdge)> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| (edge.id(), edge.target(), edge.weight()))
            .collect();
        edges.sort_by_key(|(id, _, _)| *id);
        edges
            .into_iter()
            .map(|(_, target, weight)| (target, weight))
            .collect()
    }

    /// Returns every edge from `from` to `to`.
    #[must_use]
    pub fn edges_between(&self, from: NodeIndex, to: NodeIndex) -> Vec<&DependencyEdge> {
        self.graph
            .edges_connecting(from, to)
            .map(|edge| edge.weight())
            .collect()
    }

    /// Returns every requirement that could not be wired.
    #[must_use]
    pub fn unresolved(&self) -> &[Unresolved] {
        &self.unresolved
    }

    /// Returns the unwired requirements declared by `idx`.
    pub fn unresolved_for(&self, idx: NodeIndex) -> impl Iterator<Item = &Unresolved> {
        self.unresolved.iter().filter(move |u| u.requester == idx)
    }

    pub(crate) const fn petgraph(&self) -> &Graph<GraphNode, DependencyEdge> {
        &self.graph
    }

    fn record_unresolved(&mut self, unresolved: Unresolved) {
        if !self.unresolved.contains(&unresolved) {
            self.unresolved.push(unresolved);
        }
    }
}

/// Indexes a node by an index this graph handed out.
///
/// Panics on an index from another graph, like [`petgraph::Graph`] does.
impl Index<NodeIndex> for DependencyGraph {
    type Output = GraphNode;

    fn index(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }
}

/// Upper bound of a hierarchy lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ceiling {
    /// The highest rung.
    Unbounded,
    /// The highest rung strictly below the priority.
    Below(i64),
    /// The highest rung at or below the priority.
    AtMost(i64),
}

/// Read access to the binding hierarchies of a scope.
pub trait BindingSource {
    /// Returns the highest binding of `key` within `ceiling`.
    fn binding(&self, key: &ComponentKey, ceiling: Ceiling) -> Option<(i64, Provider)>;

    /// Returns the rung of `key` whose provider constructs `target`.
    fn rung_of(&self, key: &ComponentKey, target: &ComponentKey) -> Option<i64>;
}

/// Picks the binding of `hierarchy` a lookup with `ceiling` resolves to.
#[must_use]
pub fn select_binding(
    hierarchy: &BindingHierarchy,
    ceiling: Ceiling,
) -> Option<(i64, Provider)> {
    let entry = match ceiling {
        Ceiling::Unbounded => hierarchy.highest_entry(),
        Ceiling::Below(priority) => hierarchy.entry_below(priority),
        Ceiling::AtMost(priority) => hierarchy.entry_at_most(priority),
    };
    entry.map(|(priority, provider)| (priority, provider.clone()))
}

impl<S: std::hash::BuildHasher> BindingSource for HashMap<ComponentKey, BindingHierarchy, S> {
    fn binding(&self, key: &ComponentKey, ceiling: Ceiling) -> Option<(i64, Provider)> {
        self.get(key).and_then(|hierarchy| select_binding(hierarchy, ceiling))
    }

    fn rung_of(&self, key: &ComponentKey, target: &ComponentKey) -> Option<i64> {
        self.get(key).and_then(|hierarchy| hierarchy.rung_of(target))
    }
}

/// Builds dependency graphs for one resolution pass.
pub struct GraphBuilder<'a, S: BindingSource + ?Sized> {
    bindings: &'a S,
    resolver: DependencyResolver<'a>,
}

impl<'a, S: BindingSource + ?Sized> GraphBuilder<'a, S> {
    /// Creates a builder over `bindings`, synthesizing nodes through `introspector`.
    #[must_use]
    pub const fn new(bindings: &'a S, introspector: &'a dyn Introspector) -> Self {
        Self {
            bindings,
            resolver: DependencyResolver::new(introspector),
        }
    }

    /// Builds the graph for a set of declared contexts.
    ///
    /// Every requirement of every node, including synthesized ones, is wired
    /// or recorded as unresolved. No cycle detection happens here.
    #[must_use]
    pub fn build(&self, contexts: Vec<DependencyContext>) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        let mut pending = Vec::with_capacity(contexts.len());
        for context in contexts {
            let id = NodeId::Component(context.key().clone());
            let (idx, created) = graph.add_node(id, context);
            if created {
                pending.push(idx);
            }
        }
        self.wire_pending(&mut graph, pending);
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            unresolved = graph.unresolved().len(),
            "dependency graph built"
        );
        graph
    }

    /// Resolves an entry requirement into `graph`, wiring any new nodes.
    ///
    /// Returns `None` when nothing satisfies the requirement.
    pub fn attach(&self, graph: &mut DependencyGraph, requirement: &Requirement) -> Option<Target> {
        let mut pending = Vec::new();
        let target = self.locate(graph, None, requirement, &mut pending);
        self.wire_pending(graph, pending);
        target
    }

    /// Finds or synthesizes the node satisfying `requirement` for `requester`.
    ///
    /// An unqualified requirement for a key another component declares is
    /// wired to that component even when the key is also bound. Otherwise
    /// the hierarchy decides, and the declaration is the last resort.
    /// Newly created nodes are pushed onto `pending` and still need wiring.
    pub fn locate(
        &self,
        graph: &mut DependencyGraph,
        requester: Option<NodeIndex>,
        requirement: &Requirement,
        pending: &mut Vec<NodeIndex>,
    ) -> Option<Target> {
        let key = &requirement.key;
        let ceiling = match (requirement.rung, requester) {
            (Rung::Highest, _) | (Rung::BelowOwn, None) => Ceiling::Unbounded,
            (Rung::BelowOwn, Some(idx)) => Ceiling::Below(self.own_rung(graph, idx, key)),
            (Rung::AtMost(priority), _) => Ceiling::AtMost(priority),
        };

        if requirement.rung == Rung::Highest {
            let declared = self.declared_target(graph, requester, key, pending);
            if declared.is_some() {
                return declared;
            }
        }
        if let Some((priority, provider)) = self.bindings.binding(key, ceiling) {
            return self.bound_target(graph, key, priority, &provider, pending);
        }
        self.declared_target(graph, requester, key, pending)
    }

    /// Wires to the component declared for exactly `key`, unless that
    /// component is the requester itself.
    fn declared_target(
        &self,
        graph: &mut DependencyGraph,
        requester: Option<NodeIndex>,
        key: &ComponentKey,
        pending: &mut Vec<NodeIndex>,
    ) -> Option<Target> {
        let declared = NodeId::Component(key.clone());
        let idx = match graph.find(&declared) {
            Some(idx) => idx,
            None => {
                let context = self
                    .resolver
                    .resolve_key(key, Origin::Declared, DEFAULT_PRIORITY)?;
                let (idx, created) = graph.add_node(declared, context);
                if created {
                    pending.push(idx);
                }
                idx
            }
        };
        (Some(idx) != requester).then_some(Target {
            node: idx,
            upcast: None,
        })
    }

    fn bound_target(
        &self,
        graph: &mut DependencyGraph,
        key: &ComponentKey,
        priority: i64,
        provider: &Provider,
        pending: &mut Vec<NodeIndex>,
    ) -> Option<Target> {
        let (id, upcast) = match provider {
            Provider::ContextDriven { target, upcast } => {
                (NodeId::Component(target.clone()), upcast.clone())
            }
            Provider::FixedInstance { .. } | Provider::Factory { .. } => {
                (NodeId::Binding(key.clone(), priority), None)
            }
        };
        let idx = match graph.find(&id) {
            Some(idx) => idx,
            None => {
                let context = self.resolver.resolve_binding(key, priority, provider)?;
                let (idx, created) = graph.add_node(id, context);
                if created {
                    pending.push(idx);
                }
                idx
            }
        };
        Some(Target { node: idx, upcast })
    }

    /// The rung a requester occupies in the hierarchy of `key`.
    fn own_rung(&self, graph: &DependencyGraph, requester: NodeIndex, key: &ComponentKey) -> i64 {
        let Some(node) = graph.node(requester) else {
            return DEFAULT_PRIORITY;
        };
        match node.id() {
            NodeId::Binding(bound, priority) if bound == key => *priority,
            _ => self
                .bindings
                .rung_of(key, node.key())
                .unwrap_or_else(|| node.context().priority()),
        }
    }

    fn wire_pending(&self, graph: &mut DependencyGraph, mut pending: Vec<NodeIndex>) {
        while let Some(idx) = pending.pop() {
            let requirements: Vec<(DependencyKind, Requirement)> = match graph.node(idx) {
                Some(node) => node
                    .context()
                    .dependencies()
                    .iter()
                    .map(|(kind, requirement)| (kind, requirement.clone()))
                    .collect(),
                None => continue,
            };
            for (kind, requirement) in requirements {
                match self.locate(graph, Some(idx), &requirement, &mut pending) {
                    Some(target) => {
                        let _ = graph.add_edge(
                            idx,
                            target.node,
                            DependencyEdge {
                                kind,
                                requirement,
                                upcast: target.upcast,
                            },
                        );
                    }
                    None => {
                        tracing::debug!(
                            requester = %graph[idx].key(),
                            requirement = %requirement,
                            "requirement left unresolved"
                        );
                        graph.record_unresolved(Unresolved {
                            requester: idx,
                            kind,
                            requirement,
                        });
                    }
                }
            }
        }
    }
}

impl<S: BindingSource + ?Sized> fmt::Debug for GraphBuilder<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphBuilder").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use trellis_common::types::Scope;
    use trellis_core::introspection::{ComponentRegistry, ComponentShape};

    use super::*;

    fn key(name: &str) -> ComponentKey {
        ComponentKey::symbolic(name)
    }

    fn shape(name: &str, immediate: &[&str], delayed: &[&str]) -> ComponentShape {
        ComponentShape::symbolic(
            key(name),
            Scope::Prototype,
            immediate.iter().map(|n| Requirement::of(key(n))).collect(),
            delayed.iter().map(|n| Requirement::of(key(n))).collect(),
        )
    }

    fn declared(registry: &ComponentRegistry, shapes: Vec<ComponentShape>) -> Vec<DependencyContext> {
        let resolver = DependencyResolver::new(registry);
        shapes
            .into_iter()
            .map(|s| resolver.resolve(&s, Origin::Declared, DEFAULT_PRIORITY))
            .collect()
    }

    type Table = HashMap<ComponentKey, BindingHierarchy>;

    #[test]
    fn direct_declarations_are_wired() {
        let registry = ComponentRegistry::new();
        let bindings = Table::new();
        let contexts = declared(&registry, vec![shape("Api", &["Db"], &[]), shape("Db", &[], &[])]);
        let graph = GraphBuilder::new(&bindings, &registry).build(contexts);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        let roots: Vec<ComponentKey> =
            graph.roots().iter().map(|&i| graph[i].key().clone()).collect();
        assert_eq!(roots, vec![key("Db")]);
    }

    #[test]
    fn mutual_delayed_pair_has_no_roots() {
        let registry = ComponentRegistry::new();
        let bindings = Table::new();
        let contexts = declared(&registry, vec![shape("A", &[], &["B"]), shape("B", &[], &["A"])]);
        let graph = GraphBuilder::new(&bindings, &registry).build(contexts);

        assert_eq!(graph.node_count(), 2);
        assert!(graph.roots().is_empty());
    }

    #[test]
    fn interface_requirement_synthesizes_implementation_node() {
        let registry = ComponentRegistry::new();
        registry.register_shape(shape("SqlRepo", &["Pool"], &[]));
        registry.register_shape(shape("Pool", &[], &[]));
        let mut hierarchy = BindingHierarchy::new(key("Repo"));
        let _ = hierarchy.add_default(Provider::context_driven(key("SqlRepo")));
        let bindings: Table = HashMap::from([(key("Repo"), hierarchy)]);

        let contexts = declared(&registry, vec![shape("Service", &["Repo"], &[])]);
        let graph = GraphBuilder::new(&bindings, &registry).build(contexts);

        let sql = graph
            .find(&NodeId::Component(key("SqlRepo")))
            .expect("synthesized");
        assert_eq!(
            graph.node(sql).map(|n| n.context().origin()),
            Some(Origin::Synthesized)
        );
        assert!(graph.find(&NodeId::Component(key("Pool"))).is_some());
        assert!(graph.unresolved().is_empty());
    }

    #[test]
    fn instance_bindings_become_binding_nodes() {
        let registry = ComponentRegistry::new();
        let mut hierarchy = BindingHierarchy::new(key("Port"));
        let _ = hierarchy.add(4, Provider::fixed(Arc::new(8080_u16)));
        let bindings: Table = HashMap::from([(key("Port"), hierarchy)]);

        let contexts = declared(&registry, vec![shape("Server", &["Port"], &[])]);
        let graph = GraphBuilder::new(&bindings, &registry).build(contexts);
        assert!(graph.find(&NodeId::Binding(key("Port"), 4)).is_some());
    }

    #[test]
    fn missing_requirement_is_recorded_not_failed() {
        let registry = ComponentRegistry::new();
        let bindings = Table::new();
        let contexts = declared(&registry, vec![shape("Api", &["Ghost"], &[])]);
        let graph = GraphBuilder::new(&bindings, &registry).build(contexts);

        assert_eq!(graph.unresolved().len(), 1);
        assert_eq!(graph.unresolved()[0].requirement.key, key("Ghost"));
        assert_eq!(graph.roots().len(), 1);
    }

    fn decorator_table(registry: &ComponentRegistry, decorator_requirement: Requirement) -> Table {
        registry.register_shape(shape("Low", &[], &[]));
        registry.register_shape(shape("Mid", &[], &[]));
        registry.register_shape(ComponentShape::symbolic(
            key("Decorator"),
            Scope::Prototype,
            vec![decorator_requirement],
            Vec::new(),
        ));
        let mut hierarchy = BindingHierarchy::new(key("Contract"));
        let _ = hierarchy.add_default(Provider::context_driven(key("Low")));
        let _ = hierarchy.add(0, Provider::context_driven(key("Mid")));
        let _ = hierarchy.add(1, Provider::context_driven(key("Decorator")));
        HashMap::from([(key("Contract"), hierarchy)])
    }

    fn decorated_key(requirement: Requirement) -> ComponentKey {
        let registry = ComponentRegistry::new();
        let bindings = decorator_table(&registry, requirement);
        let builder = GraphBuilder::new(&bindings, &registry);
        let mut graph = DependencyGraph::new();
        let top = builder
            .attach(&mut graph, &Requirement::of(key("Contract")))
            .expect("contract");
        assert_eq!(graph[top.node].key(), &key("Decorator"));
        let edges = graph.outgoing(top.node);
        assert_eq!(edges.len(), 1);
        graph[edges[0].0].key().clone()
    }

    #[test]
    fn below_own_resolves_to_next_lower_rung() {
        assert_eq!(decorated_key(Requirement::below_own(key("Contract"))), key("Mid"));
    }

    #[test]
    fn pinned_ceiling_resolves_to_requested_rung() {
        assert_eq!(decorated_key(Requirement::at_most(key("Contract"), -1)), key("Low"));
    }

    fn targets(graph: &DependencyGraph, name: &str) -> Vec<ComponentKey> {
        let idx = graph.find(&NodeId::Component(key(name))).expect("node");
        graph
            .outgoing(idx)
            .into_iter()
            .map(|(target, _)| graph[target].key().clone())
            .collect()
    }

    #[test]
    fn declared_component_wins_over_binding() {
        let registry = ComponentRegistry::new();
        registry.register_shape(shape("OtherRepo", &[], &[]));
        let mut hierarchy = BindingHierarchy::new(key("Repo"));
        let _ = hierarchy.add(0, Provider::context_driven(key("OtherRepo")));
        let bindings: Table = HashMap::from([(key("Repo"), hierarchy)]);

        let contexts = declared(
            &registry,
            vec![shape("Service", &["Repo"], &[]), shape("Repo", &[], &[])],
        );
        let graph = GraphBuilder::new(&bindings, &registry).build(contexts);

        assert_eq!(targets(&graph, "Service"), vec![key("Repo")]);
        assert!(graph.find(&NodeId::Component(key("OtherRepo"))).is_none());
    }

    #[test]
    fn pinned_requirement_still_consults_hierarchy() {
        let registry = ComponentRegistry::new();
        registry.register_shape(shape("OtherRepo", &[], &[]));
        let mut hierarchy = BindingHierarchy::new(key("Repo"));
        let _ = hierarchy.add(0, Provider::context_driven(key("OtherRepo")));
        let bindings: Table = HashMap::from([(key("Repo"), hierarchy)]);

        let service = ComponentShape::symbolic(
            key("Service"),
            Scope::Prototype,
            vec![Requirement::at_most(key("Repo"), 0)],
            Vec::new(),
        );
        let contexts = declared(&registry, vec![service, shape("Repo", &[], &[])]);
        let graph = GraphBuilder::new(&bindings, &registry).build(contexts);

        assert_eq!(targets(&graph, "Service"), vec![key("OtherRepo")]);
    }

    #[test]
    fn pinned_ceiling_includes_the_top_rung() {
        let registry = ComponentRegistry::new();
        let mut hierarchy = BindingHierarchy::new(key("Port"));
        let _ = hierarchy.add(i64::MAX, Provider::fixed(Arc::new(443_u16)));
        let _ = hierarchy.add(0, Provider::fixed(Arc::new(80_u16)));
        let bindings: Table = HashMap::from([(key("Port"), hierarchy)]);
        let builder = GraphBuilder::new(&bindings, &registry);

        let mut graph = DependencyGraph::new();
        let target = builder
            .attach(&mut graph, &Requirement::at_most(key("Port"), i64::MAX))
            .expect("port");
        assert_eq!(graph[target.node].id(), &NodeId::Binding(key("Port"), i64::MAX));
    }

    #[test]
    fn declaration_is_the_implicit_bottom_rung() {
        let registry = ComponentRegistry::new();
        let bindings = Table::new();
        let contexts = declared(&registry, vec![shape("Api", &[], &[])]);
        let builder = GraphBuilder::new(&bindings, &registry);
        let mut graph = builder.build(contexts);
        let target = builder
            .attach(&mut graph, &Requirement::of(key("Api")))
            .expect("declared");
        assert_eq!(graph[target.node].key(), &key("Api"));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn outgoing_edges_keep_declaration_order() {
        let registry = ComponentRegistry::new();
        let bindings = Table::new();
        let contexts = declared(
            &registry,
            vec![
                shape("Root", &["C", "A", "B"], &[]),
                shape("A", &[], &[]),
                shape("B", &[], &[]),
                shape("C", &[], &[]),
            ],
        );
        let graph = GraphBuilder::new(&bindings, &registry).build(contexts);
        let root = graph.find(&NodeId::Component(key("Root"))).expect("root");
        let order: Vec<ComponentKey> = graph
            .outgoing(root)
            .into_iter()
            .map(|(target, _)| graph[target].key().clone())
            .collect();
        assert_eq!(order, vec![key("C"), key("A"), key("B")]);
    }
}
