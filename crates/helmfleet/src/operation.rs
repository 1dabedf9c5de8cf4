//! The per-release operation run by the worker pool.
//!
//! The engine does not know what an operation does (install, diff, delete,
//! ...). It only hands each release to an implementation of
//! [`ReleaseOperation`] and records whether it succeeded.

use crate::error::OperationError;
use crate::release::ReleaseSpec;
use async_trait::async_trait;
use std::future::Future;

/// An operation applied to one release at a time.
///
/// Implementations must be `Send + Sync` since several workers call the same
/// operation concurrently. Cancellation and timeouts are the operation's own
/// business; a cancelled run should return [`OperationError::Cancelled`].
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use helmfleet::{OperationError, ReleaseOperation, ReleaseSpec};
///
/// struct Diff;
///
/// #[async_trait]
/// impl ReleaseOperation for Diff {
///     async fn run(&self, release: &ReleaseSpec, _worker_id: usize) -> Result<(), OperationError> {
///         if release.name.is_empty() {
///             return Err(OperationError::failed("release has no name"));
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ReleaseOperation: Send + Sync {
    /// Runs the operation for `release` on the worker numbered `worker_id`
    /// (1-based).
    async fn run(&self, release: &ReleaseSpec, worker_id: usize) -> Result<(), OperationError>;
}

/// Adapts an async closure into a [`ReleaseOperation`].
///
/// The closure receives its own copy of the release.
pub struct FnOperation<F> {
    f: F,
}

/// Wraps `f` as a [`ReleaseOperation`].
///
/// ```
/// use helmfleet::operation::from_fn;
/// use helmfleet::OperationError;
///
/// let op = from_fn(|release, worker_id| async move {
///     tracing::debug!(release = %release.name, worker_id, "syncing");
///     Ok::<_, OperationError>(())
/// });
/// # let _ = op;
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnOperation<F>
where
    F: Fn(ReleaseSpec, usize) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), OperationError>> + Send,
{
    FnOperation { f }
}

#[async_trait]
impl<F, Fut> ReleaseOperation for FnOperation<F>
where
    F: Fn(ReleaseSpec, usize) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), OperationError>> + Send,
{
    async fn run(&self, release: &ReleaseSpec, worker_id: usize) -> Result<(), OperationError> {
        (self.f)(release.clone(), worker_id).await
    }
}
