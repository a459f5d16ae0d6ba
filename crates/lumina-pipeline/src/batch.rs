//! Bulk processing
//!
//! Drives the orchestrator over a list of images:
//! - fixed-size chunks, then concurrency-bounded groups within a chunk;
//!   every group is awaited in full before the next starts
//! - per-image outcome isolation: one failure never aborts the batch
//! - monotonically non-decreasing progress, exactly 100 at the end
//! - one completion callback with the full successful list

use crate::config::ProcessOptions;
use crate::orchestrator::AnalysisOrchestrator;
use futures::future::join_all;
use lumina_types::{AnalysisRequest, AnalysisResult, ImageId};
use std::sync::Arc;
use std::time::Instant;
use ulid::Ulid;

/// Images queued ahead per batch pass, independent of the caller's
/// concurrency limit
pub const BATCH_CHUNK_SIZE: usize = 10;

/// Unique batch identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchId(pub Ulid);

impl BatchId {
    /// Generate a new batch id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Progress notification payload
#[derive(Debug, Clone, PartialEq)]
pub struct BatchProgress {
    /// Images attempted so far
    pub processed: usize,
    /// Batch size
    pub total: usize,
    /// `processed / total * 100`; 100.0 for empty batches
    pub percent: f64,
    /// Human-readable description of the step just finished
    pub current_step: String,
}

/// Best-effort progress hook
pub type ProgressFn = Arc<dyn Fn(&BatchProgress) + Send + Sync>;
/// Best-effort completion hook
pub type CompleteFn = Arc<dyn Fn(&[AnalysisResult]) + Send + Sync>;

/// One bulk processing request
#[derive(Clone)]
pub struct BatchRequest {
    /// Images to analyze
    pub items: Vec<AnalysisRequest>,
    /// Upper bound on concurrently processed images
    pub concurrency_limit: usize,
    /// Per-image processing options
    pub options: ProcessOptions,
    /// Invoked after every settled image
    pub on_progress: Option<ProgressFn>,
    /// Invoked once, after the last image
    pub on_complete: Option<CompleteFn>,
}

impl BatchRequest {
    /// Batch over the given items with a default concurrency of 3
    #[must_use]
    pub fn new(items: Vec<AnalysisRequest>) -> Self {
        Self {
            items,
            concurrency_limit: 3,
            options: ProcessOptions::default(),
            on_progress: None,
            on_complete: None,
        }
    }

    /// With a concurrency bound (clamped to at least 1)
    #[inline]
    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit.max(1);
        self
    }

    /// With per-image options
    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: ProcessOptions) -> Self {
        self.options = options;
        self
    }

    /// With a progress hook
    #[must_use]
    pub fn on_progress(mut self, f: impl Fn(&BatchProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    /// With a completion hook
    #[must_use]
    pub fn on_complete(mut self, f: impl Fn(&[AnalysisResult]) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for BatchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRequest")
            .field("items", &self.items.len())
            .field("concurrency_limit", &self.concurrency_limit)
            .finish_non_exhaustive()
    }
}

/// One image's failure inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Image that failed
    pub image_id: ImageId,
    /// Rendered failure message
    pub error: String,
}

/// Outcome of one batch
#[derive(Debug)]
pub struct BatchResult {
    /// Batch identity, for logs and correlation
    pub batch_id: BatchId,
    /// Fully analyzed images
    pub successful: Vec<AnalysisResult>,
    /// Failed images with their rendered errors
    pub failed: Vec<BatchFailure>,
    /// Wall time for the whole batch
    pub elapsed_ms: u64,
}

impl BatchResult {
    /// Images attempted
    #[inline]
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.successful.len() + self.failed.len()
    }
}

/// Drives the orchestrator over batches of images
#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    orchestrator: Arc<AnalysisOrchestrator>,
}

impl BatchCoordinator {
    /// Create a coordinator over an orchestrator
    #[inline]
    #[must_use]
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Process every image in the request
    ///
    /// Never fails as a whole: per-image outcomes are routed to
    /// `successful` or `failed` independently.
    pub async fn process_batch(&self, request: BatchRequest) -> BatchResult {
        let batch_id = BatchId::new();
        let total = request.items.len();
        let start = Instant::now();
        tracing::info!(
            batch_id = %batch_id,
            total,
            concurrency_limit = request.concurrency_limit,
            "processing batch"
        );

        let mut successful = Vec::new();
        let mut failed = Vec::new();
        let mut processed = 0usize;

        let limit = request.concurrency_limit.max(1);
        for chunk in request.items.chunks(BATCH_CHUNK_SIZE) {
            for group in chunk.chunks(limit) {
                let outcomes = join_all(group.iter().map(|item| {
                    let options = request.options;
                    async move {
                        let outcome = self.orchestrator.process_image(item, &options).await;
                        (item.image_id.clone(), outcome)
                    }
                }))
                .await;

                for (image_id, outcome) in outcomes {
                    processed += 1;
                    match outcome {
                        Ok(result) => successful.push(result),
                        Err(error) => {
                            tracing::warn!(batch_id = %batch_id, image_id = %image_id, error = %error, "image failed in batch");
                            failed.push(BatchFailure {
                                image_id: image_id.clone(),
                                error: error.to_string(),
                            });
                        }
                    }
                    Self::emit_progress(
                        &request,
                        processed,
                        total,
                        format!("analyzed {image_id}"),
                    );
                }
            }
        }

        if total == 0 {
            Self::emit_progress(&request, 0, 0, "empty batch".to_string());
        }
        if let Some(on_complete) = &request.on_complete {
            on_complete(&successful);
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            batch_id = %batch_id,
            successful = successful.len(),
            failed = failed.len(),
            elapsed_ms,
            "batch complete"
        );
        BatchResult {
            batch_id,
            successful,
            failed,
            elapsed_ms,
        }
    }

    fn emit_progress(request: &BatchRequest, processed: usize, total: usize, step: String) {
        let Some(on_progress) = &request.on_progress else {
            return;
        };
        let percent = if total == 0 {
            100.0
        } else {
            processed as f64 / total as f64 * 100.0
        };
        on_progress(&BatchProgress {
            processed,
            total,
            percent,
            current_step: step,
        });
    }
}
