//! Stage kinds, outputs, and per-stage results
//!
//! The five analysis stages are a closed set. Each stage's output is one
//! variant of the `StageOutput` tagged union, and every variant carries a
//! documented fallback instance so aggregation is total: a stage that
//! exhausts its retries still contributes a well-formed value, never a
//! missing entry.

use serde::{Deserialize, Serialize};

/// The closed set of analysis stage kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Object/content label detection
    Label,
    /// Face detection
    Face,
    /// Text recognition (OCR)
    Text,
    /// Image quality scoring
    Quality,
    /// Scene classification
    Scene,
}

impl StageKind {
    /// All stage kinds, in aggregation order
    pub const ALL: [StageKind; 5] = [
        StageKind::Label,
        StageKind::Face,
        StageKind::Text,
        StageKind::Quality,
        StageKind::Scene,
    ];

    /// Stable lowercase name, used in logs and progress messages
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Label => "label",
            StageKind::Face => "face",
            StageKind::Text => "text",
            StageKind::Quality => "quality",
            StageKind::Scene => "scene",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single detected label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Label name, e.g. "dog"
    pub name: String,
    /// Detection confidence in `[0, 1]`
    pub confidence: f64,
}

/// Label detection output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelSet {
    /// Detected labels, highest confidence first
    pub labels: Vec<Label>,
}

/// One detected face region in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Region width
    pub w: u32,
    /// Region height
    pub h: u32,
    /// Detection confidence in `[0, 1]`
    pub confidence: f64,
}

/// Face detection output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceSummary {
    /// Number of detected faces
    pub count: u32,
    /// Detected regions
    pub regions: Vec<FaceRegion>,
}

/// One recognized block of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Recognized text
    pub text: String,
    /// Recognition confidence in `[0, 1]`
    pub confidence: f64,
}

/// Text recognition output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextExtraction {
    /// Concatenated recognized text
    pub full_text: String,
    /// Individual recognized blocks
    pub blocks: Vec<TextBlock>,
}

/// Quality scoring output; all scores in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityReport {
    /// Sharpness score
    pub sharpness: f64,
    /// Exposure score
    pub exposure: f64,
    /// Combined quality score
    pub overall: f64,
}

/// Scene classification output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneClassification {
    /// Scene name, e.g. "beach"
    pub scene: String,
    /// Classification confidence in `[0, 1]`
    pub confidence: f64,
}

impl Default for SceneClassification {
    fn default() -> Self {
        Self {
            scene: "unknown".to_string(),
            confidence: 0.0,
        }
    }
}

/// Stage output tagged union
///
/// One variant per `StageKind`. The fallback for every variant is its
/// `Default` instance: an empty label set, zero faces, empty text, all-zero
/// quality scores, and an "unknown" scene at zero confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "output", rename_all = "snake_case")]
pub enum StageOutput {
    /// Label detection output
    Labels(LabelSet),
    /// Face detection output
    Faces(FaceSummary),
    /// Text recognition output
    Text(TextExtraction),
    /// Quality scoring output
    Quality(QualityReport),
    /// Scene classification output
    Scene(SceneClassification),
}

impl StageOutput {
    /// The stage kind this output belongs to
    #[inline]
    #[must_use]
    pub fn kind(&self) -> StageKind {
        match self {
            StageOutput::Labels(_) => StageKind::Label,
            StageOutput::Faces(_) => StageKind::Face,
            StageOutput::Text(_) => StageKind::Text,
            StageOutput::Quality(_) => StageKind::Quality,
            StageOutput::Scene(_) => StageKind::Scene,
        }
    }

    /// Documented fallback output for a stage kind
    ///
    /// Total over `StageKind`; substituted when a stage exhausts its
    /// retries or is disabled.
    #[must_use]
    pub fn fallback_for(kind: StageKind) -> Self {
        match kind {
            StageKind::Label => StageOutput::Labels(LabelSet::default()),
            StageKind::Face => StageOutput::Faces(FaceSummary::default()),
            StageKind::Text => StageOutput::Text(TextExtraction::default()),
            StageKind::Quality => StageOutput::Quality(QualityReport::default()),
            StageKind::Scene => StageOutput::Scene(SceneClassification::default()),
        }
    }

    /// Best-effort confidence carried by this output
    ///
    /// Used by aggregation to synthesize per-stage confidence when the
    /// runner does not report one. Fallback instances score 0.0.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        match self {
            StageOutput::Labels(set) => set
                .labels
                .iter()
                .map(|l| l.confidence)
                .fold(f64::NEG_INFINITY, f64::max)
                .max(0.0),
            StageOutput::Faces(summary) => summary
                .regions
                .iter()
                .map(|r| r.confidence)
                .fold(f64::NEG_INFINITY, f64::max)
                .max(0.0),
            StageOutput::Text(text) => {
                if text.blocks.is_empty() {
                    0.0
                } else {
                    text.blocks.iter().map(|b| b.confidence).sum::<f64>()
                        / text.blocks.len() as f64
                }
            }
            StageOutput::Quality(report) => report.overall,
            StageOutput::Scene(scene) => scene.confidence,
        }
    }
}

/// How a stage's slot in the result map was filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The runner produced real output
    Completed,
    /// Retries exhausted; the slot holds the fallback output
    FellBack,
    /// Stage was not enabled; the slot holds the fallback output
    Skipped,
}

/// One stage's slot in an `AnalysisResult`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// The stage's output, real or fallback
    pub output: StageOutput,
    /// How the slot was filled
    pub status: StageStatus,
    /// Attempts consumed, 0 for skipped stages
    pub attempts: u32,
    /// Wall time spent on this stage
    pub elapsed_ms: u64,
    /// Version tag of the model/runner that produced the output
    pub model_version: String,
    /// Synthesized stage confidence, 0.0 for fallback and skipped slots
    pub confidence: f64,
}

impl StageResult {
    /// A completed stage result
    #[must_use]
    pub fn completed(
        output: StageOutput,
        attempts: u32,
        elapsed_ms: u64,
        model_version: impl Into<String>,
    ) -> Self {
        let confidence = output.confidence();
        Self {
            output,
            status: StageStatus::Completed,
            attempts,
            elapsed_ms,
            model_version: model_version.into(),
            confidence,
        }
    }

    /// A fallback slot for a stage that exhausted its retries
    #[must_use]
    pub fn fell_back(
        kind: StageKind,
        attempts: u32,
        elapsed_ms: u64,
        model_version: impl Into<String>,
    ) -> Self {
        Self {
            output: StageOutput::fallback_for(kind),
            status: StageStatus::FellBack,
            attempts,
            elapsed_ms,
            model_version: model_version.into(),
            confidence: 0.0,
        }
    }

    /// A placeholder slot for a disabled stage
    #[must_use]
    pub fn skipped(kind: StageKind) -> Self {
        Self {
            output: StageOutput::fallback_for(kind),
            status: StageStatus::Skipped,
            attempts: 0,
            elapsed_ms: 0,
            model_version: String::new(),
            confidence: 0.0,
        }
    }

    /// Whether the slot holds real runner output
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == StageStatus::Completed
    }
}
