//! Error types for planning and executing releases.
//!
//! Structural problems with the declared releases ([`PlanError`]) are kept
//! apart from failures of individual release operations ([`ReleaseError`]),
//! so callers can tell an authoring mistake from a failed deployment.

use thiserror::Error;

/// Structural errors detected while planning, before any release is touched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    /// The `needs` relationships form at least one cycle.
    #[error("dependency cycle detected among releases: {}", .releases.join(", "))]
    Cycle {
        /// Releases that could not be placed into any group.
        releases: Vec<String>,
    },

    /// A release needs an identifier that no declared release carries.
    #[error("release \"{release}\" needs \"{dependency}\", which is not declared")]
    UnresolvedDependency { release: String, dependency: String },

    /// Two releases resolve to the same identifier.
    #[error("release \"{release}\" is declared more than once")]
    DuplicateRelease { release: String },

    /// A plan refers to a release the desired state does not declare.
    #[error("plan refers to unknown release \"{release}\"")]
    UnknownRelease { release: String },
}

/// Errors returned by a [`ReleaseOperation`](crate::operation::ReleaseOperation).
#[derive(Debug, Error)]
pub enum OperationError {
    /// The operation ran and reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The operation observed a cancellation signal and stopped.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation panicked while running.
    #[error("operation panicked: {0}")]
    Panicked(String),

    /// Any other error bubbled up from the operation.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OperationError {
    /// Creates a failure from any displayable message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Returns true if the operation stopped because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A failed operation, annotated with the release it ran against.
#[derive(Debug, Error)]
#[error("release \"{release}\" failed: {source}")]
pub struct ReleaseError {
    /// Name of the failing release.
    pub release: String,
    /// Identifier of the failing release.
    pub id: String,
    #[source]
    pub source: OperationError,
}

/// The outcome of a dependency-aware run that did not succeed.
#[derive(Debug, Error)]
pub enum RunError {
    /// The plan could not be built; no release was processed.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// One group finished with failures; later groups were not started.
    #[error(
        "{} release(s) failed in group {}/{}: {}",
        .errors.len(),
        .group,
        .total_groups,
        join_errors(.errors)
    )]
    Releases {
        /// 1-based position of the failing group in the plan.
        group: usize,
        total_groups: usize,
        errors: Vec<ReleaseError>,
    },
}

impl RunError {
    /// Returns true for authoring mistakes found while planning.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Plan(_))
    }

    /// Returns the per-release errors, empty for structural failures.
    pub fn release_errors(&self) -> &[ReleaseError] {
        match self {
            Self::Plan(_) => &[],
            Self::Releases { errors, .. } => errors,
        }
    }
}

fn join_errors(errors: &[ReleaseError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Conflicts between load-time overrides and the desired state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OverrideError {
    #[error("cannot use option --kube-context and set attribute helmDefaults.kubeContext")]
    KubeContextConflict,

    #[error("cannot use option --namespace and set attribute namespace")]
    NamespaceConflict,
}
