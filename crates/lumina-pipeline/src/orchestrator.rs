//! The analysis orchestrator
//!
//! Top-level coordinator for one image:
//! - deduplicates in-flight work per image id
//! - resolves a processable locator through the cache
//! - fans out to every enabled stage concurrently, each under its own
//!   retry budget
//! - aggregates stage outcomes into one immutable record
//! - optionally commits the record through the configured sink
//!
//! State machine per image: Idle → Resolving → Analyzing → Aggregating →
//! Done/Failed. A resolving failure fails the whole call fast; a stage
//! failure only degrades that stage's slot to its fallback value.

use crate::config::{PipelineConfig, ProcessOptions};
use crate::retry::{RetryContext, RetryExecutor};
use crate::stage_runner::{ResultSink, StageRegistry, StageRunner};
use dashmap::DashSet;
use futures::future::join_all;
use lumina_cache::ImageCache;
use lumina_types::{
    AnalysisError, AnalysisRequest, AnalysisResult, ImageId, StageKind, StageResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Removes an image id from the in-flight set on every exit path
struct InFlightGuard {
    set: Arc<DashSet<ImageId>>,
    id: ImageId,
}

impl InFlightGuard {
    /// Atomic check-and-insert; fails when the id is already mid-pipeline
    fn acquire(set: Arc<DashSet<ImageId>>, id: ImageId) -> Result<Self, AnalysisError> {
        if !set.insert(id.clone()) {
            return Err(AnalysisError::AlreadyProcessing(id));
        }
        Ok(Self { set, id })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}

/// Coordinates the full analysis pipeline for single images
///
/// Explicitly constructed with its collaborators; tests instantiate
/// isolated orchestrators with their own caches and runner stubs.
pub struct AnalysisOrchestrator {
    config: PipelineConfig,
    cache: Arc<ImageCache>,
    registry: StageRegistry,
    sink: Option<Arc<dyn ResultSink>>,
    retry: RetryExecutor,
    in_flight: Arc<DashSet<ImageId>>,
}

impl AnalysisOrchestrator {
    /// Create an orchestrator
    #[must_use]
    pub fn new(config: PipelineConfig, cache: Arc<ImageCache>, registry: StageRegistry) -> Self {
        let retry = RetryExecutor::new(config.retry);
        Self {
            config,
            cache,
            registry,
            sink: None,
            retry,
            in_flight: Arc::new(DashSet::new()),
        }
    }

    /// With a persistence sink
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The configuration this orchestrator runs under
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of images currently mid-pipeline
    #[inline]
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Run the full pipeline for one image
    ///
    /// # Errors
    /// - `AlreadyProcessing` when the id is currently in flight
    /// - the cache/resolver failure when no processable locator exists
    /// - `PersistFailed` (carrying the computed result) when the sink
    ///   rejects the commit
    pub async fn process_image(
        &self,
        request: &AnalysisRequest,
        options: &ProcessOptions,
    ) -> Result<AnalysisResult, AnalysisError> {
        let _guard =
            InFlightGuard::acquire(Arc::clone(&self.in_flight), request.image_id.clone())?;
        let start = Instant::now();
        tracing::info!(image_id = %request.image_id, "processing image");

        // Resolving: no partial result past a resolution failure.
        let locator = self
            .cache
            .resolve(&request.image_id, &request.source_locator)
            .await?;

        // Analyzing: one retry-wrapped future per enabled stage. Stages
        // settle independently; an exhausted stage only degrades its own
        // slot.
        let mut stage_results: HashMap<StageKind, StageResult> = HashMap::new();
        let mut running = Vec::new();
        for kind in StageKind::ALL {
            if !self.config.is_enabled(kind) {
                stage_results.insert(kind, StageResult::skipped(kind));
                continue;
            }
            match self.registry.get(kind) {
                Some(runner) => {
                    running.push(self.run_stage(kind, Arc::clone(runner), locator.clone()));
                }
                None => {
                    tracing::debug!(stage = %kind, "no runner registered, skipping");
                    stage_results.insert(kind, StageResult::skipped(kind));
                }
            }
        }
        for (kind, result) in join_all(running).await {
            stage_results.insert(kind, result);
        }

        // Aggregating
        let result = AnalysisResult::assemble(
            request.image_id.clone(),
            request.source_locator.clone(),
            stage_results,
            start.elapsed().as_millis() as u64,
            self.config.pipeline_version.clone(),
        );
        tracing::info!(
            image_id = %request.image_id,
            elapsed_ms = result.metadata.elapsed_ms,
            completed = result.completed_count(),
            fallbacks = result.fallback_count(),
            overall_confidence = result.metadata.overall_confidence,
            "analysis aggregated"
        );

        if !options.skip_persist {
            if let Some(sink) = &self.sink {
                if let Err(error) = sink
                    .commit(&request.image_id, &request.owner_id, &result)
                    .await
                {
                    tracing::warn!(image_id = %request.image_id, error = %error, "persist failed");
                    return Err(AnalysisError::PersistFailed {
                        image_id: request.image_id.clone(),
                        message: error.to_string(),
                        result: Box::new(result),
                    });
                }
            }
        }

        Ok(result)
    }

    /// Run one stage under the retry policy, settling to a total result
    async fn run_stage(
        &self,
        kind: StageKind,
        runner: Arc<dyn StageRunner>,
        locator: String,
    ) -> (StageKind, StageResult) {
        let stage_timeout = self.config.stage_timeout;
        let runner_for_op = Arc::clone(&runner);
        let outcome = self
            .retry
            .execute(RetryContext::new(kind.name(), locator), move |loc| {
                let runner = Arc::clone(&runner_for_op);
                async move {
                    let attempt_start = Instant::now();
                    match tokio::time::timeout(stage_timeout, runner.run(&loc)).await {
                        Ok(result) => result,
                        Err(_) => Err(AnalysisError::Timeout {
                            operation: runner.kind().name().to_string(),
                            elapsed_ms: attempt_start.elapsed().as_millis() as u64,
                        }),
                    }
                }
            })
            .await;

        let model_version = runner.model_version().to_string();
        match outcome.result {
            Ok(output) if output.kind() == kind => (
                kind,
                StageResult::completed(output, outcome.attempts, outcome.elapsed_ms, model_version),
            ),
            Ok(output) => {
                tracing::warn!(
                    stage = %kind,
                    produced = %output.kind(),
                    "runner produced output for the wrong stage, using fallback"
                );
                (
                    kind,
                    StageResult::fell_back(kind, outcome.attempts, outcome.elapsed_ms, model_version),
                )
            }
            Err(error) => {
                tracing::warn!(
                    stage = %kind,
                    attempts = outcome.attempts,
                    error = %error,
                    "stage exhausted, using fallback"
                );
                (
                    kind,
                    StageResult::fell_back(kind, outcome.attempts, outcome.elapsed_ms, model_version),
                )
            }
        }
    }
}

impl std::fmt::Debug for AnalysisOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisOrchestrator")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}
