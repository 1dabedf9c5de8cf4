//! `helmfleet` - dependency-aware concurrent execution of chart releases.
//!
//! Releases declare the releases they `needs`. The engine turns those
//! declarations into a layered plan, then runs a caller-supplied operation
//! (install, diff, delete, ...) over each group with a bounded worker pool:
//!
//! - [`graph::DependencyGraph`] maps every release identifier to its needs.
//! - [`graph::plan`] partitions the graph into groups, failing on cycles,
//!   unknown needs and duplicate identifiers.
//! - [`ScatterGather`] runs one group with a fixed number of workers and
//!   gathers exactly one outcome per release.
//! - [`ReleaseEngine`] visits the groups forward (install) or in reverse
//!   (delete) and stops at the first group with a failure.
//!
//! The engine does not retry, roll back, or guess missing dependencies.

pub mod config;
pub mod error;
pub mod graph;
pub mod loader;
pub mod observability;
pub mod operation;
pub mod orchestrator;
pub mod release;
pub mod scatter_gather;

pub use config::{EngineConfig, ExclusiveScope};
pub use error::{OperationError, OverrideError, PlanError, ReleaseError, RunError};
pub use graph::{DependencyGraph, ExecutionPlan};
pub use loader::LoadOverrides;
pub use operation::{FnOperation, ReleaseOperation};
pub use orchestrator::{Direction, ReleaseEngine, RunPhase};
pub use release::{DesiredState, HelmDefaults, ReleaseSpec};
pub use scatter_gather::{Outcome, PoolReport, ScatterGather, resolve_concurrency};
