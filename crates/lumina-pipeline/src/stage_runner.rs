//! External collaborator seams
//!
//! The orchestrator treats all five analysis kinds uniformly through the
//! [`StageRunner`] trait, and commits finished records through the
//! [`ResultSink`] trait. Both are pluggable black boxes: the core never
//! looks inside a stage's output beyond its kind and confidence, and
//! never depends on where results are persisted.

use async_trait::async_trait;
use lumina_types::{AnalysisError, AnalysisResult, ImageId, OwnerId, StageKind, StageOutput};
use std::collections::HashMap;
use std::sync::Arc;

/// One pluggable analysis capability
///
/// Implementations must be pure functions of the input locator: no
/// shared orchestrator state is reachable from a runner.
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// The stage kind this runner implements
    fn kind(&self) -> StageKind;

    /// Version tag of the underlying model, stamped into stage results
    fn model_version(&self) -> &str;

    /// Analyze the image behind a resolved locator
    ///
    /// # Errors
    /// Any `AnalysisError`; adapters wrapping platform errors should
    /// translate them once via `ErrorClassifier::classify_raw`.
    async fn run(&self, locator: &str) -> Result<StageOutput, AnalysisError>;
}

/// Persistence callback for committed analysis records
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Commit one finished record
    ///
    /// # Errors
    /// A failure here surfaces from `process_image` as `PersistFailed`
    /// but never invalidates the computed result.
    async fn commit(
        &self,
        image_id: &ImageId,
        owner_id: &OwnerId,
        result: &AnalysisResult,
    ) -> Result<(), AnalysisError>;
}

/// Registered stage runners, keyed by their own reported kind
#[derive(Default)]
pub struct StageRegistry {
    runners: HashMap<StageKind, Arc<dyn StageRunner>>,
}

impl StageRegistry {
    /// Empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a runner under its own kind, replacing any previous one
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn StageRunner>) -> Self {
        self.runners.insert(runner.kind(), runner);
        self
    }

    /// Look up the runner for a kind
    #[inline]
    #[must_use]
    pub fn get(&self, kind: StageKind) -> Option<&Arc<dyn StageRunner>> {
        self.runners.get(&kind)
    }

    /// Kinds with a registered runner
    #[must_use]
    pub fn kinds(&self) -> Vec<StageKind> {
        let mut kinds: Vec<StageKind> = self.runners.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Number of registered runners
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.runners.len()
    }

    /// Whether no runner is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }
}

impl std::fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumina_types::LabelSet;

    struct NullRunner(StageKind);

    #[async_trait]
    impl StageRunner for NullRunner {
        fn kind(&self) -> StageKind {
            self.0
        }

        fn model_version(&self) -> &str {
            "null-v0"
        }

        async fn run(&self, _locator: &str) -> Result<StageOutput, AnalysisError> {
            Ok(StageOutput::Labels(LabelSet::default()))
        }
    }

    #[test]
    fn registry_keys_by_runner_kind() {
        let registry = StageRegistry::new()
            .with_runner(Arc::new(NullRunner(StageKind::Label)))
            .with_runner(Arc::new(NullRunner(StageKind::Scene)));

        assert_eq!(registry.len(), 2);
        assert!(registry.get(StageKind::Label).is_some());
        assert!(registry.get(StageKind::Text).is_none());
        assert_eq!(registry.kinds(), vec![StageKind::Label, StageKind::Scene]);
    }

    #[test]
    fn re_registering_replaces() {
        let registry = StageRegistry::new()
            .with_runner(Arc::new(NullRunner(StageKind::Label)))
            .with_runner(Arc::new(NullRunner(StageKind::Label)));
        assert_eq!(registry.len(), 1);
    }
}
