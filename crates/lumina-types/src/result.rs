//! Aggregated analysis results
//!
//! `AnalysisResult` is the one consolidated record produced per image.
//! It is immutable once constructed; the builder computes the overall
//! confidence at construction time.

use crate::request::ImageId;
use crate::stage::{StageKind, StageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result-level metadata computed during aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Wall time for the whole pipeline run
    pub elapsed_ms: u64,
    /// When aggregation finished
    pub completed_at: DateTime<Utc>,
    /// Mean confidence over completed stages, 0.0 when none completed
    pub overall_confidence: f64,
    /// Version tag of the pipeline that produced this record
    pub pipeline_version: String,
}

/// One consolidated analysis record per image
///
/// The stage map is total over the configured stage set: disabled stages
/// appear as skipped slots holding their fallback output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Image this record describes
    pub image_id: ImageId,
    /// The locator the request carried, pre-normalization
    pub source_locator: String,
    /// Per-stage outcomes, keyed by stage kind
    pub stage_results: HashMap<StageKind, StageResult>,
    /// Aggregation metadata
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    /// Assemble a result, deriving the overall confidence
    ///
    /// Overall confidence is the arithmetic mean of completed-stage
    /// confidences; 0.0 when no stage completed.
    #[must_use]
    pub fn assemble(
        image_id: ImageId,
        source_locator: impl Into<String>,
        stage_results: HashMap<StageKind, StageResult>,
        elapsed_ms: u64,
        pipeline_version: impl Into<String>,
    ) -> Self {
        let completed: Vec<f64> = stage_results
            .values()
            .filter(|r| r.is_completed())
            .map(|r| r.confidence)
            .collect();
        let overall_confidence = if completed.is_empty() {
            0.0
        } else {
            completed.iter().sum::<f64>() / completed.len() as f64
        };

        Self {
            image_id,
            source_locator: source_locator.into(),
            stage_results,
            metadata: AnalysisMetadata {
                elapsed_ms,
                completed_at: Utc::now(),
                overall_confidence,
                pipeline_version: pipeline_version.into(),
            },
        }
    }

    /// Look up one stage's slot
    #[inline]
    #[must_use]
    pub fn stage(&self, kind: StageKind) -> Option<&StageResult> {
        self.stage_results.get(&kind)
    }

    /// Count of stages that produced real output
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.stage_results
            .values()
            .filter(|r| r.is_completed())
            .count()
    }

    /// Count of stages that degraded to their fallback output
    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.stage_results
            .values()
            .filter(|r| r.status == crate::stage::StageStatus::FellBack)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{StageOutput, StageResult};

    fn completed(kind: StageKind, confidence: f64) -> StageResult {
        let mut result =
            StageResult::completed(StageOutput::fallback_for(kind), 1, 10, "test-v1");
        result.confidence = confidence;
        result
    }

    #[test]
    fn overall_confidence_is_mean_of_completed() {
        let mut stages = HashMap::new();
        stages.insert(StageKind::Label, completed(StageKind::Label, 0.8));
        stages.insert(StageKind::Scene, completed(StageKind::Scene, 0.4));
        stages.insert(StageKind::Text, StageResult::skipped(StageKind::Text));

        let result =
            AnalysisResult::assemble(ImageId::new("img"), "/p.jpg", stages, 42, "v1");
        assert!((result.metadata.overall_confidence - 0.6).abs() < f64::EPSILON);
        assert_eq!(result.completed_count(), 2);
    }

    #[test]
    fn overall_confidence_zero_when_nothing_completed() {
        let mut stages = HashMap::new();
        stages.insert(StageKind::Label, StageResult::skipped(StageKind::Label));
        stages.insert(
            StageKind::Face,
            StageResult::fell_back(StageKind::Face, 3, 30, "face-v1"),
        );

        let result =
            AnalysisResult::assemble(ImageId::new("img"), "/p.jpg", stages, 42, "v1");
        assert_eq!(result.metadata.overall_confidence, 0.0);
        assert_eq!(result.fallback_count(), 1);
    }

    #[test]
    fn result_serde_round_trip() {
        let mut stages = HashMap::new();
        stages.insert(StageKind::Quality, completed(StageKind::Quality, 0.5));
        let result =
            AnalysisResult::assemble(ImageId::new("img"), "/p.jpg", stages, 7, "v1");

        let json = serde_json::to_string(&result).unwrap();
        let back: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }
}
