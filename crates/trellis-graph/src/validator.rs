//! Cycle detection and instantiation planning.
//!
//! A cycle whose hops are all delayed is resolvable: each member can be
//! built on its own and the mutual references are wired afterwards. A
//! cycle with at least one immediate hop is fatal.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use petgraph::graph::NodeIndex;
use petgraph::visit::Dfs;
use trellis_common::error::{Result, TrellisError};
use trellis_common::types::{ComponentKey, DependencyKind};

use crate::graph::DependencyGraph;

/// One member of a discovered sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredComponent {
    /// The key as it was requested.
    pub declared: ComponentKey,
    /// The key of the component actually bound.
    pub actual: ComponentKey,
}

impl fmt::Display for DiscoveredComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.declared == self.actual {
            write!(f, "{}", self.actual)
        } else {
            write!(f, "{} ({})", self.declared, self.actual)
        }
    }
}

/// Output of cycle analysis for one queried node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentDiscoveryList {
    /// Components to construct eagerly, dependencies first.
    pub discovered_components: Vec<DiscoveredComponent>,
    /// The full rotated cycle, empty when no cycle was found.
    pub discovered_components_cyclic: Vec<DiscoveredComponent>,
}

impl ComponentDiscoveryList {
    /// Returns `true` if a cycle was found.
    #[must_use]
    pub fn is_cyclic(&self) -> bool {
        !self.discovered_components_cyclic.is_empty()
    }
}

/// One step of an instantiation plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    /// Construct a single node.
    Single(NodeIndex),
    /// Construct a resolvable cycle through placeholders.
    Cycle {
        /// Members of the cycle, ordered by key.
        members: Vec<NodeIndex>,
        /// Cycle analysis for the first member.
        discovery: ComponentDiscoveryList,
    },
}

impl PlanStep {
    /// Returns the nodes constructed by this step.
    #[must_use]
    pub fn nodes(&self) -> &[NodeIndex] {
        match self {
            Self::Single(idx) => std::slice::from_ref(idx),
            Self::Cycle { members, .. } => members,
        }
    }
}

/// Ordered construction steps, dependencies first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstantiationPlan {
    steps: Vec<PlanStep>,
}

impl InstantiationPlan {
    /// Returns the steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Returns every planned node in execution order.
    #[must_use]
    pub fn order(&self) -> Vec<NodeIndex> {
        self.steps
            .iter()
            .flat_map(|step| step.nodes().iter().copied())
            .collect()
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if nothing needs constructing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Walks a dependency graph looking for cycles.
#[derive(Debug, Clone, Copy)]
pub struct CyclicDependencyValidator<'g> {
    graph: &'g DependencyGraph,
}

impl<'g> CyclicDependencyValidator<'g> {
    /// Creates a validator over `graph`.
    #[must_use]
    pub const fn new(graph: &'g DependencyGraph) -> Self {
        Self { graph }
    }

    /// Depth-first search for the first cycle reachable from `node`.
    ///
    /// `path` holds the nodes already on the walk. The result is the cycle
    /// rotated to start at its first repeated node, or empty when no cycle is
    /// reachable. Edges are followed in declaration order, so querying a
    /// cycle from any member yields the same sequence rotated to that member.
    #[must_use]
    pub fn check_not_cyclic(&self, node: NodeIndex, path: &mut Vec<NodeIndex>) -> Vec<NodeIndex> {
        let mut cleared = HashSet::new();
        self.walk(node, path, &mut cleared)
    }

    fn walk(
        &self,
        node: NodeIndex,
        path: &mut Vec<NodeIndex>,
        cleared: &mut HashSet<NodeIndex>,
    ) -> Vec<NodeIndex> {
        if let Some(pos) = path.iter().position(|&seen| seen == node) {
            return path[pos..].to_vec();
        }
        if cleared.contains(&node) {
            return Vec::new();
        }
        path.push(node);
        for (target, _) in self.graph.outgoing(node) {
            let cycle = self.walk(target, path, cleared);
            if !cycle.is_empty() {
                return cycle;
            }
        }
        let _ = path.pop();
        let _ = cleared.insert(node);
        Vec::new()
    }

    /// Analyses the region reachable from `node`.
    ///
    /// Without a cycle, `discovered_components` lists the reachable nodes
    /// dependencies first. A resolvable cycle leaves it empty and fills
    /// `discovered_components_cyclic`.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::CyclicComponent`] if the first cycle found has
    /// an immediate hop.
    pub fn discover(&self, node: NodeIndex) -> Result<ComponentDiscoveryList> {
        let cycle = self.check_not_cyclic(node, &mut Vec::new());
        if cycle.is_empty() {
            let discovered_components = self
                .postorder(node)
                .into_iter()
                .map(|idx| {
                    let key = self.graph[idx].key().clone();
                    DiscoveredComponent {
                        declared: key.clone(),
                        actual: key,
                    }
                })
                .collect();
            return Ok(ComponentDiscoveryList {
                discovered_components,
                discovered_components_cyclic: Vec::new(),
            });
        }
        self.classify(&cycle)
    }

    /// Classifies a cycle returned by [`Self::check_not_cyclic`].
    ///
    /// A hop counts as immediate if any edge between its two nodes is.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::CyclicComponent`] naming the last immediate
    /// hop of the cycle, with the chain rotated to start at its smallest key.
    pub fn classify(&self, cycle: &[NodeIndex]) -> Result<ComponentDiscoveryList> {
        let len = cycle.len();
        let mut cyclic = Vec::with_capacity(len);
        let mut blamed_hop = None;
        for (i, &member) in cycle.iter().enumerate() {
            let previous = cycle[(i + len - 1) % len];
            let next = cycle[(i + 1) % len];
            let declared = self
                .graph
                .edges_between(previous, member)
                .first()
                .map_or_else(
                    || self.graph[member].key().clone(),
                    |edge| edge.requirement.key.clone(),
                );
            cyclic.push(DiscoveredComponent {
                declared,
                actual: self.graph[member].key().clone(),
            });
            if self
                .graph
                .edges_between(member, next)
                .iter()
                .any(|edge| edge.kind == DependencyKind::Immediate)
            {
                blamed_hop = Some((member, next));
            }
        }

        match blamed_hop {
            None => Ok(ComponentDiscoveryList {
                discovered_components: Vec::new(),
                discovered_components_cyclic: cyclic,
            }),
            Some((requester, blamed)) => Err(TrellisError::CyclicComponent {
                requester: self.graph[requester].key().clone(),
                blamed: self.graph[blamed].key().clone(),
                chain: normalized_chain(
                    cycle.iter().map(|&idx| self.graph[idx].key().clone()).collect(),
                ),
            }),
        }
    }

    /// Orders everything reachable from `entries` into construction steps.
    ///
    /// Strongly connected regions become [`PlanStep::Cycle`] steps when all
    /// their internal edges are delayed.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::CyclicComponent`] for the first region with an
    /// immediate internal edge. Nothing is constructed in that case.
    pub fn plan(&self, entries: &[NodeIndex]) -> Result<InstantiationPlan> {
        let graph = self.graph.petgraph();
        let mut reachable = HashSet::new();
        for &entry in entries {
            if graph.node_weight(entry).is_none() {
                continue;
            }
            let mut dfs = Dfs::new(graph, entry);
            while let Some(idx) = dfs.next(graph) {
                let _ = reachable.insert(idx);
            }
        }

        let mut steps = Vec::new();
        for mut region in petgraph::algo::tarjan_scc(graph) {
            if !region.iter().any(|idx| reachable.contains(idx)) {
                continue;
            }
            region.sort_by_key(|&idx| self.graph[idx].key().clone());
            if region.len() == 1 && !self.has_self_loop(region[0]) {
                steps.push(PlanStep::Single(region[0]));
                continue;
            }
            if let Some(cycle) = self.immediate_cycle(&region) {
                return Err(self.classify(&cycle).err().unwrap_or_else(|| {
                    TrellisError::UnresolvableCycle {
                        key: self.graph[cycle[0]].key().clone(),
                    }
                }));
            }
            let discovery = self.region_discovery(&region)?;
            steps.push(PlanStep::Cycle {
                members: region,
                discovery,
            });
        }
        tracing::debug!(steps = steps.len(), "instantiation plan computed");
        Ok(InstantiationPlan { steps })
    }

    fn has_self_loop(&self, idx: NodeIndex) -> bool {
        !self.graph.edges_between(idx, idx).is_empty()
    }

    /// Finds a cycle through an immediate edge inside `region`, if any.
    fn immediate_cycle(&self, region: &[NodeIndex]) -> Option<Vec<NodeIndex>> {
        let members: HashSet<NodeIndex> = region.iter().copied().collect();
        for &from in region {
            for (to, edge) in self.graph.outgoing(from) {
                if edge.kind != DependencyKind::Immediate || !members.contains(&to) {
                    continue;
                }
                let mut cycle = vec![from];
                if to != from {
                    cycle.extend(self.shortest_path(to, from, &members));
                }
                return Some(cycle);
            }
        }
        None
    }

    /// Breadth-first path from `start` to just before `goal`, within `members`.
    fn shortest_path(
        &self,
        start: NodeIndex,
        goal: NodeIndex,
        members: &HashSet<NodeIndex>,
    ) -> Vec<NodeIndex> {
        let mut parent = std::collections::HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut seen = HashSet::from([start]);
        while let Some(current) = queue.pop_front() {
            for (next, _) in self.graph.outgoing(current) {
                if next == goal {
                    let mut path = vec![current];
                    let mut cursor = current;
                    while let Some(&p) = parent.get(&cursor) {
                        path.push(p);
                        cursor = p;
                    }
                    path.reverse();
                    return path;
                }
                if members.contains(&next) && seen.insert(next) {
                    let _ = parent.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        vec![start]
    }

    fn region_discovery(&self, region: &[NodeIndex]) -> Result<ComponentDiscoveryList> {
        let members: HashSet<NodeIndex> = region.iter().copied().collect();
        let mut cleared: HashSet<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|idx| !members.contains(idx))
            .collect();
        let cycle = self.walk(region[0], &mut Vec::new(), &mut cleared);
        self.classify(&cycle)
    }

    fn postorder(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        self.visit(node, &mut visited, &mut order);
        order
    }

    fn visit(&self, node: NodeIndex, visited: &mut HashSet<NodeIndex>, order: &mut Vec<NodeIndex>) {
        if !visited.insert(node) {
            return;
        }
        for (target, _) in self.graph.outgoing(node) {
            self.visit(target, visited, order);
        }
        order.push(node);
    }
}

/// Rotates a cycle so it starts at its smallest key.
#[must_use]
pub fn normalized_chain(mut chain: Vec<ComponentKey>) -> Vec<ComponentKey> {
    if let Some(start) = chain
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
    {
        chain.rotate_left(start);
    }
    chain
}
