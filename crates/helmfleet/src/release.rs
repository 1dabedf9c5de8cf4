//! Release descriptors handed over by the desired-state loader.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// One deployable chart release.
///
/// Releases are identified by [`ReleaseSpec::id`], which combines the name
/// with the kube context and namespace so that equally named releases in
/// different places do not collide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_context: Option<String>,

    /// Identifiers of releases that must be processed in an earlier group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,

    /// Requests exclusive access to the shared cluster-side resource.
    ///
    /// `None` defers to [`HelmDefaults::exclusive`].
    #[serde(default, alias = "tillerless", skip_serializing_if = "Option::is_none")]
    pub exclusive: Option<bool>,
}

impl ReleaseSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_kube_context(mut self, kube_context: impl Into<String>) -> Self {
        self.kube_context = Some(kube_context.into());
        self
    }

    /// Adds a dependency on the release with the given identifier.
    pub fn with_need(mut self, id: impl Into<String>) -> Self {
        self.needs.push(id.into());
        self
    }

    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = Some(exclusive);
        self
    }

    /// Returns the identifier used for dependency references:
    /// `[kube_context/][namespace/]name`.
    pub fn id(&self) -> String {
        let mut id = String::new();
        for part in [&self.kube_context, &self.namespace].into_iter().flatten() {
            if !part.is_empty() {
                id.push_str(part);
                id.push('/');
            }
        }
        id.push_str(&self.name);
        id
    }

    /// Returns the release as an operation should see it, with the
    /// state-wide namespace and kube context filled in where the release
    /// leaves them unset.
    ///
    /// Identifiers used for planning are always computed from the declared
    /// release, never from this view.
    pub fn with_state_defaults(
        &self,
        namespace: Option<&str>,
        kube_context: Option<&str>,
    ) -> Cow<'_, ReleaseSpec> {
        let namespace = namespace.filter(|_| is_unset(&self.namespace));
        let kube_context = kube_context.filter(|_| is_unset(&self.kube_context));
        if namespace.is_none() && kube_context.is_none() {
            return Cow::Borrowed(self);
        }

        let mut release = self.clone();
        if let Some(namespace) = namespace {
            release.namespace = Some(namespace.to_string());
        }
        if let Some(kube_context) = kube_context {
            release.kube_context = Some(kube_context.to_string());
        }
        Cow::Owned(release)
    }

    /// Resolves whether this release needs exclusive access, falling back to
    /// the run-wide default when the release does not say.
    pub fn requires_exclusive(&self, defaults: &HelmDefaults) -> bool {
        self.exclusive.unwrap_or(defaults.exclusive)
    }
}

fn is_unset(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(str::is_empty)
}

/// Run-wide defaults shared by every release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmDefaults {
    /// Forces exclusive access for every release that does not override it.
    #[serde(default, alias = "tillerless")]
    pub exclusive: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_context: Option<String>,
}

/// The loaded desired state: defaults plus the ordered list of releases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default)]
    pub helm_defaults: HelmDefaults,

    #[serde(default)]
    pub releases: Vec<ReleaseSpec>,
}

impl DesiredState {
    pub fn new(releases: Vec<ReleaseSpec>) -> Self {
        Self {
            releases,
            ..Default::default()
        }
    }

    pub fn with_defaults(mut self, helm_defaults: HelmDefaults) -> Self {
        self.helm_defaults = helm_defaults;
        self
    }

    /// Parses a desired state rendered to JSON by the loader.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// `release` with this state's namespace and default kube context
    /// applied.
    pub fn effective_release<'r>(&self, release: &'r ReleaseSpec) -> Cow<'r, ReleaseSpec> {
        release.with_state_defaults(
            self.namespace.as_deref().filter(|ns| !ns.is_empty()),
            self.helm_defaults
                .kube_context
                .as_deref()
                .filter(|ctx| !ctx.is_empty()),
        )
    }

    /// Returns true if any of `releases` resolves to exclusive access under
    /// this state's defaults.
    pub fn any_exclusive<'a, I>(&self, releases: I) -> bool
    where
        I: IntoIterator<Item = &'a ReleaseSpec>,
    {
        releases
            .into_iter()
            .any(|r| r.requires_exclusive(&self.helm_defaults))
    }
}
