//! Dependency graph construction and layered planning.
//!
//! Releases are turned into a [`DependencyGraph`] and partitioned by [`plan`]
//! into groups that can each run concurrently, one group after another.

pub mod dependency_graph;
pub mod planner;

pub use dependency_graph::DependencyGraph;
pub use planner::{ExecutionPlan, plan};
