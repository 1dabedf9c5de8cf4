//! Dependency graph over release identifiers.
//!
//! The graph keeps both forward edges (the releases a release needs) and
//! reverse edges (the releases that need it), plus the order in which nodes
//! were declared so that plans enumerate releases reproducibly.

use crate::release::ReleaseSpec;
use std::collections::HashMap;

/// A directed graph of release dependencies.
///
/// Building the graph never fails. Unknown `needs` references and duplicate
/// identifiers are recorded as-is and rejected later by
/// [`plan`](super::planner::plan), which is the single place structural
/// errors are reported.
///
/// # Examples
///
/// ```
/// use helmfleet::graph::DependencyGraph;
///
/// let mut graph = DependencyGraph::new();
/// graph.add_node("db");
/// graph.add_node("api");
/// graph.add_dependency("api", "db"); // api needs db
///
/// assert_eq!(graph.get_dependencies("api"), ["db".to_string()]);
/// assert_eq!(graph.get_dependents("db"), ["api".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Node identifiers in declaration order.
    order: Vec<String>,
    /// Forward edges: id -> ids it needs, in first-mention order.
    nodes: HashMap<String, Vec<String>>,
    /// Reverse edges: id -> ids that need it.
    reverse_edges: HashMap<String, Vec<String>>,
    /// Identifiers that were declared more than once.
    duplicates: Vec<String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph for a list of releases, registering each release's
    /// identifier and one edge per entry in its `needs`.
    pub fn build(releases: &[ReleaseSpec]) -> Self {
        let mut graph = Self::new();
        for release in releases {
            let id = release.id();
            if !graph.add_node(&id) {
                graph.duplicates.push(id.clone());
            }
            for need in &release.needs {
                graph.add_dependency(&id, need);
            }
        }
        graph
    }

    /// Adds a node without dependencies.
    ///
    /// Returns `false` if the node was already present, in which case the
    /// graph is unchanged.
    pub fn add_node(&mut self, id: &str) -> bool {
        if self.nodes.contains_key(id) {
            return false;
        }
        self.nodes.insert(id.to_string(), Vec::new());
        self.order.push(id.to_string());
        true
    }

    /// Adds an edge: `id` needs `depends_on`.
    ///
    /// `id` is registered if missing. `depends_on` is not: a dependency that
    /// never gets its own node is an unresolved reference.
    pub fn add_dependency(&mut self, id: &str, depends_on: &str) {
        self.add_node(id);

        let deps = self.nodes.entry(id.to_string()).or_default();
        if deps.iter().any(|d| d == depends_on) {
            return;
        }
        deps.push(depends_on.to_string());

        self.reverse_edges
            .entry(depends_on.to_string())
            .or_default()
            .push(id.to_string());
    }

    /// Returns the identifiers `id` needs, or an empty slice for unknown ids.
    pub fn get_dependencies(&self, id: &str) -> &[String] {
        self.nodes.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the identifiers that need `id`.
    pub fn get_dependents(&self, id: &str) -> &[String] {
        self.reverse_edges
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Node identifiers in declaration order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Identifiers declared more than once, in the order they repeated.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }
}
