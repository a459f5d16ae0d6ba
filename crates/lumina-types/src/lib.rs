//! Lumina Types - shared data model for the analysis pipeline
//!
//! Defines the types every other Lumina crate speaks:
//! - Image/owner identifiers and the `AnalysisRequest` unit of work
//! - The closed `StageKind` set and `StageOutput` tagged union with
//!   per-kind documented fallbacks
//! - The consolidated `AnalysisResult` record
//! - The `AnalysisError` taxonomy and derived `ErrorClassification`

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod request;
pub mod result;
pub mod stage;

// Re-exports for convenience
pub use error::{AnalysisError, ErrorClassification, ErrorKind};
pub use request::{AnalysisRequest, ImageId, OwnerId};
pub use result::{AnalysisMetadata, AnalysisResult};
pub use stage::{
    FaceRegion, FaceSummary, Label, LabelSet, QualityReport, SceneClassification, StageKind,
    StageOutput, StageResult, StageStatus, TextBlock, TextExtraction,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Lumina types
    pub use crate::{
        AnalysisError, AnalysisRequest, AnalysisResult, ErrorClassification, ErrorKind, ImageId,
        OwnerId, StageKind, StageOutput, StageResult, StageStatus,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
