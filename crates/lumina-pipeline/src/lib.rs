//! Lumina Pipeline - analysis orchestration
//!
//! The coordination layer of the photo analysis backbone:
//! - Deduplicates in-flight work per image id
//! - Resolves and caches processable locators
//! - Fans out to pluggable analysis stages with bounded retries
//! - Aggregates per-stage outcomes into one consolidated record
//! - Drives bulk processing with progress reporting and partial-failure
//!   isolation
//!
//! # Example
//!
//! ```rust,ignore
//! use lumina_pipeline::{AnalysisOrchestrator, PipelineConfig, StageRegistry};
//! use lumina_cache::{CacheConfig, ImageCache};
//! use lumina_types::AnalysisRequest;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(ImageCache::open(CacheConfig::new("/tmp/index.json")).await?);
//! let registry = StageRegistry::new(); // register real runners here
//! let orchestrator = AnalysisOrchestrator::new(PipelineConfig::new(), cache, registry);
//!
//! let request = AnalysisRequest::new("img-1", "/photos/a.jpg", "user-1");
//! let result = orchestrator.process_image(&request, &Default::default()).await?;
//! println!("confidence {}", result.metadata.overall_confidence);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod batch;
pub mod classifier;
pub mod config;
pub mod orchestrator;
pub mod retry;
pub mod stage_runner;

// Re-exports for convenience
pub use batch::{
    BatchCoordinator, BatchFailure, BatchId, BatchProgress, BatchRequest, BatchResult,
    CompleteFn, ProgressFn, BATCH_CHUNK_SIZE,
};
pub use classifier::ErrorClassifier;
pub use config::{PipelineConfig, ProcessOptions};
pub use orchestrator::AnalysisOrchestrator;
pub use retry::{RetryConfig, RetryContext, RetryExecutor, RetryOutcome};
pub use stage_runner::{ResultSink, StageRegistry, StageRunner};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the Lumina pipeline
    pub use crate::{
        AnalysisOrchestrator, BatchCoordinator, BatchRequest, ErrorClassifier, PipelineConfig,
        ProcessOptions, ResultSink, RetryConfig, RetryExecutor, StageRegistry, StageRunner,
    };
    pub use lumina_types::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
