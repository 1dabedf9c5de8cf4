//! Configuration for release execution.

use serde::{Deserialize, Serialize};

/// Which releases are scanned when deciding whether a pool run must be
/// serialized for exclusive access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusiveScope {
    /// Only the releases handed to the pool run.
    #[default]
    Batch,
    /// Every release declared in the desired state, even when only a subset
    /// is being executed.
    AllReleases,
}

/// Configuration for the release engine.
///
/// # Examples
///
/// ```
/// use helmfleet::{EngineConfig, ExclusiveScope};
///
/// let config = EngineConfig::new()
///     .with_concurrency(4)
///     .with_exclusive_scope(ExclusiveScope::AllReleases);
///
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of releases processed at once within a group.
    ///
    /// `0` means one worker per release. Values above the number of
    /// releases in a pool run are clamped down to it. Exclusive access
    /// forces a single worker regardless of this value.
    #[serde(default)]
    pub concurrency: usize,

    #[serde(default)]
    pub exclusive_scope: ExclusiveScope,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Creates a configuration with unlimited concurrency and batch-scoped
    /// exclusive-access detection.
    pub fn new() -> Self {
        Self {
            concurrency: 0,
            exclusive_scope: ExclusiveScope::Batch,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Removes the concurrency limit.
    pub fn with_unlimited_concurrency(mut self) -> Self {
        self.concurrency = 0;
        self
    }

    pub fn with_exclusive_scope(mut self, scope: ExclusiveScope) -> Self {
        self.exclusive_scope = scope;
        self
    }

    /// Parses a configuration from JSON, filling in defaults for missing
    /// fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.concurrency, 0);
        assert_eq!(config.exclusive_scope, ExclusiveScope::Batch);
    }

    #[test]
    fn test_builder_chain() {
        let config = EngineConfig::new()
            .with_concurrency(8)
            .with_exclusive_scope(ExclusiveScope::AllReleases);

        assert_eq!(config.concurrency, 8);
        assert_eq!(config.exclusive_scope, ExclusiveScope::AllReleases);
    }

    #[test]
    fn test_with_unlimited_concurrency() {
        let config = EngineConfig::new()
            .with_concurrency(3)
            .with_unlimited_concurrency();
        assert_eq!(config.concurrency, 0);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = EngineConfig::from_json(r#"{ "concurrency": 2 }"#).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.exclusive_scope, ExclusiveScope::Batch);

        let config = EngineConfig::from_json(r#"{ "exclusive_scope": "all_releases" }"#).unwrap();
        assert_eq!(config.concurrency, 0);
        assert_eq!(config.exclusive_scope, ExclusiveScope::AllReleases);
    }

    #[test]
    fn test_from_json_rejects_unknown_scope() {
        assert!(EngineConfig::from_json(r#"{ "exclusive_scope": "cluster" }"#).is_err());
    }
}
