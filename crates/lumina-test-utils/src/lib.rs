//! Testing utilities for the Lumina workspace
//!
//! Shared stage-runner stubs, sink fakes, and fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use lumina_cache::{CacheConfig, ImageCache};
use lumina_pipeline::{ResultSink, StageRegistry, StageRunner};
use lumina_types::{
    AnalysisError, AnalysisResult, FaceRegion, FaceSummary, ImageId, Label, LabelSet, OwnerId,
    QualityReport, SceneClassification, StageKind, StageOutput, TextBlock, TextExtraction,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A plausible non-fallback output for a stage kind
pub fn sample_output(kind: StageKind) -> StageOutput {
    match kind {
        StageKind::Label => StageOutput::Labels(LabelSet {
            labels: vec![
                Label {
                    name: "dog".to_string(),
                    confidence: 0.93,
                },
                Label {
                    name: "grass".to_string(),
                    confidence: 0.71,
                },
            ],
        }),
        StageKind::Face => StageOutput::Faces(FaceSummary {
            count: 1,
            regions: vec![FaceRegion {
                x: 120,
                y: 80,
                w: 64,
                h: 64,
                confidence: 0.88,
            }],
        }),
        StageKind::Text => StageOutput::Text(TextExtraction {
            full_text: "EXIT".to_string(),
            blocks: vec![TextBlock {
                text: "EXIT".to_string(),
                confidence: 0.95,
            }],
        }),
        StageKind::Quality => StageOutput::Quality(QualityReport {
            sharpness: 0.8,
            exposure: 0.6,
            overall: 0.7,
        }),
        StageKind::Scene => StageOutput::Scene(SceneClassification {
            scene: "park".to_string(),
            confidence: 0.82,
        }),
    }
}

/// Runner that always returns a fixed output
pub struct FixedRunner {
    kind: StageKind,
    output: StageOutput,
    model_version: String,
}

impl FixedRunner {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            output: sample_output(kind),
            model_version: format!("{kind}-stub-v1"),
        }
    }

    pub fn with_output(kind: StageKind, output: StageOutput) -> Self {
        Self {
            kind,
            output,
            model_version: format!("{kind}-stub-v1"),
        }
    }
}

#[async_trait]
impl StageRunner for FixedRunner {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn model_version(&self) -> &str {
        &self.model_version
    }

    async fn run(&self, _locator: &str) -> Result<StageOutput, AnalysisError> {
        Ok(self.output.clone())
    }
}

/// Runner that always fails with a fixed error
pub struct FailingRunner {
    kind: StageKind,
    error: AnalysisError,
    calls: AtomicU32,
}

impl FailingRunner {
    pub fn new(kind: StageKind, error: AnalysisError) -> Self {
        Self {
            kind,
            error,
            calls: AtomicU32::new(0),
        }
    }

    pub fn always_processing_failed(kind: StageKind) -> Self {
        Self::new(
            kind,
            AnalysisError::ProcessingFailed(format!("{kind} stub failure")),
        )
    }

    /// Attempts observed so far
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StageRunner for FailingRunner {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn model_version(&self) -> &str {
        "failing-stub-v1"
    }

    async fn run(&self, _locator: &str) -> Result<StageOutput, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Runner that fails a fixed number of times, then succeeds
pub struct FlakyRunner {
    kind: StageKind,
    remaining_failures: AtomicU32,
}

impl FlakyRunner {
    pub fn new(kind: StageKind, failures_before_success: u32) -> Self {
        Self {
            kind,
            remaining_failures: AtomicU32::new(failures_before_success),
        }
    }
}

#[async_trait]
impl StageRunner for FlakyRunner {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn model_version(&self) -> &str {
        "flaky-stub-v1"
    }

    async fn run(&self, _locator: &str) -> Result<StageOutput, AnalysisError> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AnalysisError::Timeout {
                operation: self.kind.name().to_string(),
                elapsed_ms: 5,
            });
        }
        Ok(sample_output(self.kind))
    }
}

/// Runner that records every locator it was invoked with
pub struct RecordingRunner {
    kind: StageKind,
    locators: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            locators: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_locators(&self) -> Vec<String> {
        self.locators.lock().unwrap().clone()
    }
}

#[async_trait]
impl StageRunner for RecordingRunner {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn model_version(&self) -> &str {
        "recording-stub-v1"
    }

    async fn run(&self, locator: &str) -> Result<StageOutput, AnalysisError> {
        self.locators.lock().unwrap().push(locator.to_string());
        Ok(sample_output(self.kind))
    }
}

/// In-memory sink recording every committed record
#[derive(Default)]
pub struct RecordingSink {
    commits: Mutex<Vec<(ImageId, OwnerId, AnalysisResult)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn committed(&self) -> Vec<(ImageId, OwnerId, AnalysisResult)> {
        self.commits.lock().unwrap().clone()
    }

    pub fn commit_count(&self) -> usize {
        self.commits.lock().unwrap().len()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn commit(
        &self,
        image_id: &ImageId,
        owner_id: &OwnerId,
        result: &AnalysisResult,
    ) -> Result<(), AnalysisError> {
        self.commits
            .lock()
            .unwrap()
            .push((image_id.clone(), owner_id.clone(), result.clone()));
        Ok(())
    }
}

/// Sink that rejects every commit
#[derive(Default)]
pub struct FailingSink;

#[async_trait]
impl ResultSink for FailingSink {
    async fn commit(
        &self,
        _image_id: &ImageId,
        _owner_id: &OwnerId,
        _result: &AnalysisResult,
    ) -> Result<(), AnalysisError> {
        Err(AnalysisError::ProcessingFailed(
            "sink unavailable".to_string(),
        ))
    }
}

/// Registry with a fixed runner for all five stages
pub fn full_registry() -> StageRegistry {
    StageKind::ALL.into_iter().fold(StageRegistry::new(), |r, kind| {
        r.with_runner(Arc::new(FixedRunner::new(kind)))
    })
}

/// Cache rooted in a fresh temp dir, plus a photo dir to populate
pub async fn temp_cache() -> (TempDir, Arc<ImageCache>, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let photo_dir = dir.path().join("photos");
    std::fs::create_dir_all(&photo_dir).unwrap();
    let cache = ImageCache::open(CacheConfig::new(dir.path().join("index.json")))
        .await
        .unwrap();
    (dir, Arc::new(cache), photo_dir)
}

/// Write a dummy photo file, returning its absolute path
pub fn write_photo(dir: &std::path::Path, name: &str, size: usize) -> String {
    let path = dir.join(name);
    std::fs::write(&path, vec![0u8; size]).unwrap();
    path.to_string_lossy().into_owned()
}

/// Install a test tracing subscriber (idempotent)
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
