//! Computes and renders resolution plans for manifests.
//!
//! Wraps the graph builder and cycle validator into a high-level API for
//! tools that inspect a scope without instantiating it.

use std::fmt;
use std::path::Path;

use petgraph::graph::NodeIndex;
use trellis_common::error::{Result, TrellisError};
use trellis_common::types::{ComponentKey, DependencyKind, Requirement, Scope};
use trellis_core::hierarchy::BindingHierarchy;
use trellis_graph::graph::DependencyGraph;
use trellis_graph::validator::{ComponentDiscoveryList, CyclicDependencyValidator, PlanStep};
use trellis_runtime::context::ApplicationContext;

use crate::manifest::{Manifest, parse_key};

/// One rendered step of a resolution plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedStep {
    /// A single node.
    Single {
        /// Node label, `Key` or `Key[priority]` for binding nodes.
        label: String,
        /// Instance lifetime of the node.
        scope: Scope,
    },
    /// A resolvable cycle.
    Cycle {
        /// Members, ordered by key.
        members: Vec<ComponentKey>,
        /// Cycle analysis from the first member.
        discovery: ComponentDiscoveryList,
    },
}

/// A requirement nothing in the scope satisfies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRequirement {
    /// Component that declared the requirement.
    pub requester: ComponentKey,
    /// The requirement itself.
    pub requirement: Requirement,
    /// When it was needed.
    pub kind: DependencyKind,
}

/// Construction order for every node of a scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionPlan {
    /// Steps in construction order, dependencies first.
    pub steps: Vec<PlannedStep>,
    /// Requirements that were left unresolved.
    pub unresolved: Vec<UnresolvedRequirement>,
}

impl ResolutionPlan {
    fn from_graph(graph: &DependencyGraph, steps: &[PlanStep]) -> Self {
        let steps = steps
            .iter()
            .map(|step| match step {
                PlanStep::Single(idx) => single(graph, *idx),
                PlanStep::Cycle { members, discovery } => PlannedStep::Cycle {
                    members: members.iter().map(|idx| graph[*idx].key().clone()).collect(),
                    discovery: discovery.clone(),
                },
            })
            .collect();
        let unresolved = graph
            .unresolved()
            .iter()
            .map(|u| UnresolvedRequirement {
                requester: graph[u.requester].key().clone(),
                requirement: u.requirement.clone(),
                kind: u.kind,
            })
            .collect();
        Self { steps, unresolved }
    }

    /// Returns `true` if any step is a cycle.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, PlannedStep::Cycle { .. }))
    }
}

fn single(graph: &DependencyGraph, idx: NodeIndex) -> PlannedStep {
    match graph.node(idx) {
        Some(node) => PlannedStep::Single {
            label: node.id().to_string(),
            scope: node.context().scope(),
        },
        None => PlannedStep::Single {
            label: graph[idx].key().to_string(),
            scope: Scope::default(),
        },
    }
}

impl fmt::Display for ResolutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, step) in self.steps.iter().enumerate() {
            match step {
                PlannedStep::Single { label, scope } => writeln!(f, "{}. {label} ({scope})", n + 1)?,
                PlannedStep::Cycle { members, discovery } => {
                    let names: Vec<String> = members.iter().map(ToString::to_string).collect();
                    writeln!(f, "{}. cycle [{}]", n + 1, names.join(", "))?;
                    if !discovery.discovered_components.is_empty() {
                        writeln!(f, "   eager: {}", joined(&discovery.discovered_components, ", "))?;
                    }
                    if discovery.is_cyclic() {
                        writeln!(
                            f,
                            "   cycle: {}",
                            joined(&discovery.discovered_components_cyclic, " -> ")
                        )?;
                    }
                }
            }
        }
        for u in &self.unresolved {
            writeln!(
                f,
                "unresolved: {} required by {} ({})",
                u.requirement, u.requester, u.kind
            )?;
        }
        Ok(())
    }
}

fn joined<T: fmt::Display>(items: &[T], separator: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

/// High-level resolver over a manifest-configured scope.
#[derive(Debug)]
pub struct GraphResolver {
    context: ApplicationContext,
}

impl GraphResolver {
    /// Configures a resolver from a parsed manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest is invalid.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        Ok(Self {
            context: manifest.into_context()?,
        })
    }

    /// Loads a manifest file and configures a resolver from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_manifest(&Manifest::load(path)?)
    }

    /// Returns the underlying scope.
    #[must_use]
    pub const fn context(&self) -> &ApplicationContext {
        &self.context
    }

    /// Computes the construction order of every node in the scope.
    ///
    /// Unresolved requirements are reported in the plan, not as errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope contains a fatal cycle.
    pub fn plan(&self) -> Result<ResolutionPlan> {
        let graph = self.context.scope_graph();
        let entries: Vec<NodeIndex> = graph.node_indices().collect();
        let plan = CyclicDependencyValidator::new(&graph).plan(&entries)?;
        tracing::info!(
            nodes = graph.node_count(),
            steps = plan.len(),
            unresolved = graph.unresolved().len(),
            "plan computed"
        );
        Ok(ResolutionPlan::from_graph(&graph, plan.steps()))
    }

    /// Validates the scope under its own strictness setting.
    ///
    /// # Errors
    ///
    /// Returns the first fatal cycle, or in strict mode the first unresolved
    /// requirement.
    pub fn check(&self) -> Result<()> {
        self.context.validate()
    }

    /// Returns every binding hierarchy, ordered by key.
    #[must_use]
    pub fn hierarchies(&self) -> Vec<BindingHierarchy> {
        self.context
            .bindings()
            .keys()
            .iter()
            .filter_map(|key| self.context.hierarchy(key))
            .collect()
    }

    /// Returns the hierarchy for a key written as `Name` or `Name::qualifier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is malformed or has no bindings.
    pub fn hierarchy(&self, key: &str) -> Result<BindingHierarchy> {
        let key = parse_key(key)?;
        self.context
            .hierarchy(&key)
            .ok_or_else(|| TrellisError::ComponentResolution {
                key,
                required_by: None,
            })
    }
}
