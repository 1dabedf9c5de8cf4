//! Load-time overrides applied to a freshly loaded desired state.
//!
//! Parsing and templating belong to the loader; this module only carries the
//! post-processing that decides release order and run-wide targets.

use crate::error::OverrideError;
use crate::release::DesiredState;
use tracing::debug;

/// Overrides taken from the command line after the state files are loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOverrides {
    /// Kube context for every release; conflicts with `helmDefaults.kubeContext`.
    pub kube_context: Option<String>,
    /// Namespace for the whole state; conflicts with a declared namespace.
    pub namespace: Option<String>,
    /// Reverses the declared release order.
    pub reverse: bool,
}

impl LoadOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kube_context(mut self, kube_context: impl Into<String>) -> Self {
        self.kube_context = Some(kube_context.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Applies the overrides in place.
    ///
    /// The state is left untouched when a conflict is reported.
    pub fn apply(&self, state: &mut DesiredState) -> Result<(), OverrideError> {
        let kube_context = non_empty(&self.kube_context);
        let namespace = non_empty(&self.namespace);

        if kube_context.is_some() && non_empty(&state.helm_defaults.kube_context).is_some() {
            return Err(OverrideError::KubeContextConflict);
        }
        if namespace.is_some() && non_empty(&state.namespace).is_some() {
            return Err(OverrideError::NamespaceConflict);
        }

        if self.reverse {
            state.releases.reverse();
            debug!(releases = state.releases.len(), "reversed release order");
        }
        if let Some(kube_context) = kube_context {
            state.helm_defaults.kube_context = Some(kube_context.to_string());
        }
        if let Some(namespace) = namespace {
            state.namespace = Some(namespace.to_string());
        }

        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
