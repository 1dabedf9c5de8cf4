//! Layered topological planning.
//!
//! [`plan`] partitions a [`DependencyGraph`] into groups such that every
//! release's dependencies sit in strictly earlier groups. Group 0 holds the
//! releases that need nothing; group `k` holds the releases whose needs are
//! all satisfied by groups `0..k`.

use super::DependencyGraph;
use crate::error::PlanError;
use std::collections::HashMap;
use std::fmt;

/// Ordered groups of release identifiers.
///
/// Every declared release appears in exactly one group. Inside a group the
/// identifiers follow declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    groups: Vec<Vec<String>>,
}

impl ExecutionPlan {
    pub fn new(groups: Vec<Vec<String>>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of releases across all groups.
    pub fn release_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    /// Index of the group containing `id`.
    pub fn group_of(&self, id: &str) -> Option<usize> {
        self.groups
            .iter()
            .position(|group| group.iter().any(|g| g == id))
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Vec<String>> {
        self.groups.iter()
    }

    pub fn into_groups(self) -> Vec<Vec<String>> {
        self.groups
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[{}]", group.join(", "))?;
        }
        write!(f, "]")
    }
}

/// Computes the layered plan for `graph`.
///
/// Fails without returning any partial plan when an identifier is declared
/// twice, when a release needs an undeclared identifier, or when the needs
/// contain a cycle.
pub fn plan(graph: &DependencyGraph) -> Result<ExecutionPlan, PlanError> {
    if let Some(release) = graph.duplicates().first() {
        return Err(PlanError::DuplicateRelease {
            release: release.clone(),
        });
    }

    for id in graph.ids() {
        if let Some(missing) = graph
            .get_dependencies(id)
            .iter()
            .find(|dep| !graph.contains(dep))
        {
            return Err(PlanError::UnresolvedDependency {
                release: id.clone(),
                dependency: missing.clone(),
            });
        }
    }

    let position: HashMap<&str, usize> = graph
        .ids()
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    // Number of needs not yet placed into an earlier group.
    let mut pending: HashMap<&str, usize> = graph
        .ids()
        .iter()
        .map(|id| (id.as_str(), graph.get_dependencies(id).len()))
        .collect();

    let mut current: Vec<&str> = graph
        .ids()
        .iter()
        .map(String::as_str)
        .filter(|id| pending[id] == 0)
        .collect();

    let mut groups: Vec<Vec<String>> = Vec::new();
    let mut placed = 0usize;

    while !current.is_empty() {
        placed += current.len();

        let mut next = Vec::new();
        for id in &current {
            for dependent in graph.get_dependents(id) {
                if let Some(count) = pending.get_mut(dependent.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        next.push(dependent.as_str());
                    }
                }
            }
        }
        next.sort_by_key(|id| position[id]);

        groups.push(current.iter().map(|id| id.to_string()).collect());
        current = next;
    }

    if placed < graph.node_count() {
        let releases = graph
            .ids()
            .iter()
            .filter(|id| pending[id.as_str()] > 0)
            .cloned()
            .collect();
        return Err(PlanError::Cycle { releases });
    }

    Ok(ExecutionPlan::new(groups))
}
