//! Pipeline configuration

use crate::retry::RetryConfig;
use lumina_types::StageKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Stages the orchestrator fans out to; disabled stages still get a
    /// skipped slot in every result
    pub enabled_stages: BTreeSet<StageKind>,
    /// Retry policy applied to each stage independently
    pub retry: RetryConfig,
    /// Time bound on a single stage attempt
    pub stage_timeout: Duration,
    /// Version tag stamped into result metadata
    pub pipeline_version: String,
}

impl PipelineConfig {
    /// Default configuration: all stages enabled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With an explicit enabled stage set
    #[must_use]
    pub fn with_stages(mut self, stages: impl IntoIterator<Item = StageKind>) -> Self {
        self.enabled_stages = stages.into_iter().collect();
        self
    }

    /// With one stage disabled
    #[must_use]
    pub fn without_stage(mut self, stage: StageKind) -> Self {
        self.enabled_stages.remove(&stage);
        self
    }

    /// With a retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// With a per-attempt stage time bound
    #[inline]
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// With a pipeline version tag
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.pipeline_version = version.into();
        self
    }

    /// Whether a stage is enabled
    #[inline]
    #[must_use]
    pub fn is_enabled(&self, stage: StageKind) -> bool {
        self.enabled_stages.contains(&stage)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled_stages: StageKind::ALL.into_iter().collect(),
            retry: RetryConfig::default(),
            stage_timeout: Duration::from_secs(30),
            pipeline_version: "lumina-v1".to_string(),
        }
    }
}

/// Per-call processing options
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Skip the persistence callback after aggregation
    pub skip_persist: bool,
}

impl ProcessOptions {
    /// Default options: persist when a sink is configured
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the persistence callback
    #[inline]
    #[must_use]
    pub fn skip_persist(mut self) -> Self {
        self.skip_persist = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_enables_every_stage() {
        let config = PipelineConfig::new();
        for kind in StageKind::ALL {
            assert!(config.is_enabled(kind));
        }
    }

    #[test]
    fn without_stage_disables_it() {
        let config = PipelineConfig::new().without_stage(StageKind::Text);
        assert!(!config.is_enabled(StageKind::Text));
        assert!(config.is_enabled(StageKind::Label));
    }

    #[test]
    fn options_builder() {
        assert!(!ProcessOptions::new().skip_persist);
        assert!(ProcessOptions::new().skip_persist().skip_persist);
    }
}
