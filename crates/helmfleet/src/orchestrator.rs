//! Dependency-aware execution of releases, one group at a time.
//!
//! [`ReleaseEngine`] plans the declared releases into groups and runs each
//! group through a [`ScatterGather`] pool. Groups run strictly one after
//! another and the run stops at the first group that reports any failure.

use crate::config::{EngineConfig, ExclusiveScope};
use crate::error::{OperationError, PlanError, ReleaseError, RunError};
use crate::graph::{DependencyGraph, ExecutionPlan, plan};
use crate::operation::ReleaseOperation;
use crate::release::{DesiredState, ReleaseSpec};
use crate::scatter_gather::ScatterGather;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};

/// Order in which plan groups are visited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Group 0 first. Dependencies are handled before their dependents, as
    /// needed when installing or upgrading.
    #[default]
    Forward,
    /// Last group first. Dependents are handled before the releases they
    /// need, as needed when deleting.
    Reverse,
}

impl Direction {
    /// Plan indices in the order this direction visits them.
    pub fn order(self, groups: usize) -> Vec<usize> {
        match self {
            Direction::Forward => (0..groups).collect(),
            Direction::Reverse => (0..groups).rev().collect(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }
}

/// Where a dependency-aware run currently stands.
///
/// `Succeeded` and both `Failed` variants are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// No run has started yet.
    Idle,
    Planning,
    /// Running the group at this 0-based plan index.
    Executing { group: usize },
    Succeeded,
    /// Planning failed; no release was touched.
    FailedStructural,
    /// The group at this 0-based plan index reported failures.
    FailedExecution { group: usize },
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunPhase::Succeeded | RunPhase::FailedStructural | RunPhase::FailedExecution { .. }
        )
    }
}

/// Runs an operation over the releases of a desired state.
///
/// # Examples
///
/// ```
/// use helmfleet::{DesiredState, Direction, ReleaseEngine, ReleaseSpec};
/// use helmfleet::operation::from_fn;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let state = DesiredState::new(vec![
///     ReleaseSpec::new("db"),
///     ReleaseSpec::new("api").with_need("db"),
/// ]);
///
/// let mut engine = ReleaseEngine::new(&state);
/// let op = Arc::new(from_fn(|_release, _worker| async { Ok(()) }));
///
/// engine.dag_aware_iterate(Direction::Forward, op).await.unwrap();
/// # }
/// ```
pub struct ReleaseEngine<'a> {
    state: &'a DesiredState,
    config: EngineConfig,
    phase: RunPhase,
}

impl<'a> ReleaseEngine<'a> {
    pub fn new(state: &'a DesiredState) -> Self {
        Self::with_config(state, EngineConfig::default())
    }

    pub fn with_config(state: &'a DesiredState, config: EngineConfig) -> Self {
        Self {
            state,
            config,
            phase: RunPhase::Idle,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Phase reached by the most recent dependency-aware run.
    pub fn last_phase(&self) -> RunPhase {
        self.phase
    }

    /// Builds the dependency graph and plans it.
    pub fn plan(&self) -> Result<ExecutionPlan, PlanError> {
        plan(&DependencyGraph::build(&self.state.releases))
    }

    /// Whether a pool run over `releases` must be serialized.
    fn requires_exclusive(&self, releases: &[ReleaseSpec]) -> bool {
        match self.config.exclusive_scope {
            ExclusiveScope::Batch => self.state.any_exclusive(releases),
            ExclusiveScope::AllReleases => self.state.any_exclusive(&self.state.releases),
        }
    }

    /// Runs `operation` over `releases` in a single pool run, ignoring
    /// dependencies between them.
    ///
    /// The operation sees each release with the state's namespace and
    /// default kube context filled in; errors still carry the declared
    /// identifiers.
    pub async fn iterate_on_releases<O>(
        &self,
        releases: &[ReleaseSpec],
        operation: Arc<O>,
    ) -> Vec<ReleaseError>
    where
        O: ReleaseOperation + ?Sized + 'static,
    {
        let exclusive = self.requires_exclusive(releases);
        let operation = Arc::new(WithStateDefaults {
            namespace: self.state.namespace.clone(),
            kube_context: self.state.helm_defaults.kube_context.clone(),
            inner: operation,
        });
        ScatterGather::new(operation, self.config.concurrency)
            .run(releases, exclusive)
            .await
    }

    /// Runs `operation` over every declared release in a single pool run,
    /// ignoring `needs`.
    pub async fn scatter_gather_releases<O>(&self, operation: Arc<O>) -> Vec<ReleaseError>
    where
        O: ReleaseOperation + ?Sized + 'static,
    {
        self.iterate_on_releases(&self.state.releases, operation)
            .await
    }

    /// Plans the declared releases and runs `operation` over them group by
    /// group in the given direction.
    ///
    /// Structural problems are reported as [`RunError::Plan`] before any
    /// release is touched.
    pub async fn dag_aware_iterate<O>(
        &mut self,
        direction: Direction,
        operation: Arc<O>,
    ) -> Result<(), RunError>
    where
        O: ReleaseOperation + ?Sized + 'static,
    {
        self.transition(RunPhase::Planning);

        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "failed to plan releases");
                self.transition(RunPhase::FailedStructural);
                return Err(e.into());
            }
        };

        self.run_plan(&plan, direction, operation).await
    }

    /// Runs `operation` over the groups of `plan` in the given direction.
    ///
    /// Each group runs through its own pool and must finish completely
    /// before the next one starts. The first group with any failure stops
    /// the run; later groups are never attempted.
    ///
    /// A plan may cover only part of the declared releases. Identifiers
    /// that are not declared, or that appear more than once, fail the run
    /// before any group starts.
    pub async fn run_plan<O>(
        &mut self,
        plan: &ExecutionPlan,
        direction: Direction,
        operation: Arc<O>,
    ) -> Result<(), RunError>
    where
        O: ReleaseOperation + ?Sized + 'static,
    {
        let groups = match self.resolve_groups(plan) {
            Ok(groups) => groups,
            Err(e) => {
                self.transition(RunPhase::FailedStructural);
                return Err(e.into());
            }
        };
        let total_groups = groups.len();

        let span = info_span!(
            "dag_run",
            direction = direction.as_str(),
            groups = total_groups
        );

        async {
            debug!(
                "processing {} groups of releases in this order: {}",
                total_groups, plan
            );

            for index in direction.order(total_groups) {
                self.transition(RunPhase::Executing { group: index });

                let releases = &groups[index];
                debug!(
                    "processing releases in group {}/{}: {}",
                    index + 1,
                    total_groups,
                    plan.groups()[index].join(", ")
                );

                let errors = self
                    .iterate_on_releases(releases, Arc::clone(&operation))
                    .instrument(info_span!("release_group", index = index + 1))
                    .await;

                if !errors.is_empty() {
                    warn!(
                        group = index + 1,
                        failed = errors.len(),
                        "group failed, skipping remaining groups"
                    );
                    self.transition(RunPhase::FailedExecution { group: index });
                    return Err(RunError::Releases {
                        group: index + 1,
                        total_groups,
                        errors,
                    });
                }
            }

            self.transition(RunPhase::Succeeded);
            info!(groups = total_groups, "all release groups completed");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Maps every identifier in `plan` back to its declared release.
    fn resolve_groups(&self, plan: &ExecutionPlan) -> Result<Vec<Vec<ReleaseSpec>>, PlanError> {
        let by_id: HashMap<String, &ReleaseSpec> = self
            .state
            .releases
            .iter()
            .map(|r| (r.id(), r))
            .collect();
        let mut seen: HashSet<&str> = HashSet::new();

        let mut groups = Vec::with_capacity(plan.len());
        for group in plan.iter() {
            let mut releases = Vec::with_capacity(group.len());
            for id in group {
                let release = by_id.get(id).ok_or_else(|| PlanError::UnknownRelease {
                    release: id.clone(),
                })?;
                if !seen.insert(id.as_str()) {
                    return Err(PlanError::DuplicateRelease {
                        release: id.clone(),
                    });
                }
                releases.push((*release).clone());
            }
            groups.push(releases);
        }
        Ok(groups)
    }

    fn transition(&mut self, next: RunPhase) {
        debug!(from = ?self.phase, to = ?next, "run phase changed");
        self.phase = next;
    }
}

/// Hands the operation each release with the state-wide namespace and
/// kube context applied.
struct WithStateDefaults<O: ?Sized> {
    namespace: Option<String>,
    kube_context: Option<String>,
    inner: Arc<O>,
}

#[async_trait]
impl<O> ReleaseOperation for WithStateDefaults<O>
where
    O: ReleaseOperation + ?Sized,
{
    async fn run(&self, release: &ReleaseSpec, worker_id: usize) -> Result<(), OperationError> {
        let release = release.with_state_defaults(
            self.namespace.as_deref().filter(|ns| !ns.is_empty()),
            self.kube_context.as_deref().filter(|ctx| !ctx.is_empty()),
        );
        self.inner.run(&release, worker_id).await
    }
}
