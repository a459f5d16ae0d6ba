//! Error taxonomy for the analysis pipeline
//!
//! Every failure in the core maps to exactly one `ErrorKind`. The
//! structured `AnalysisError` carries the kind at the point of failure;
//! classification (recoverable/retryable flags plus an optional repair
//! suggestion) is derived fresh per failure, never stored.

use crate::request::ImageId;
use crate::result::AnalysisResult;
use serde::{Deserialize, Serialize};

/// Failure taxonomy kinds, in classification priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input locator was empty or structurally unusable
    InvalidLocator,
    /// Locator carries a corrupted embedded identifier or suffix
    PathCorruption,
    /// The file genuinely does not exist
    FileNotFound,
    /// Image bytes are malformed or unreadable
    InvalidImage,
    /// A time bound was exceeded
    Timeout,
    /// Generic stage or persistence failure
    ProcessingFailed,
    /// The image id is already mid-pipeline
    AlreadyProcessing,
    /// Anything else
    Unknown,
}

/// Main pipeline error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    /// Locator was empty or not usable as a path
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    /// Locator carries a corruption signature
    #[error("corrupt locator {locator}: {detail}")]
    PathCorruption {
        /// The corrupted locator as observed
        locator: String,
        /// What looked wrong about it
        detail: String,
    },

    /// File does not exist at the resolved location
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Image bytes are malformed or undecodable
    #[error("invalid image data: {0}")]
    InvalidImage(String),

    /// A stage or I/O operation exceeded its time bound
    #[error("timed out after {elapsed_ms}ms: {operation}")]
    Timeout {
        /// What timed out
        operation: String,
        /// How long it ran before the bound tripped
        elapsed_ms: u64,
    },

    /// Generic stage failure
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    /// Duplicate concurrent request for an in-flight image
    #[error("image {0} is already being processed")]
    AlreadyProcessing(ImageId),

    /// Persistence callback failed after analysis completed
    ///
    /// Carries the computed result so the caller can still inspect it.
    #[error("persist failed for {image_id}: {message}")]
    PersistFailed {
        /// Image whose result failed to commit
        image_id: ImageId,
        /// Sink's failure message
        message: String,
        /// The analysis that was computed before the commit failed
        result: Box<AnalysisResult>,
    },

    /// Unclassifiable failure
    #[error("unknown failure: {0}")]
    Unknown(String),
}

impl AnalysisError {
    /// The taxonomy kind of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidLocator(_) => ErrorKind::InvalidLocator,
            Self::PathCorruption { .. } => ErrorKind::PathCorruption,
            Self::FileNotFound(_) => ErrorKind::FileNotFound,
            Self::InvalidImage(_) => ErrorKind::InvalidImage,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ProcessingFailed(_) | Self::PersistFailed { .. } => ErrorKind::ProcessingFailed,
            Self::AlreadyProcessing(_) => ErrorKind::AlreadyProcessing,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Extract the computed result from a persistence failure
    #[inline]
    #[must_use]
    pub fn into_partial_result(self) -> Option<AnalysisResult> {
        match self {
            Self::PersistFailed { result, .. } => Some(*result),
            _ => None,
        }
    }
}

/// Derived classification of one failure
///
/// Computed fresh per failure by the classifier; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassification {
    /// Taxonomy kind
    pub kind: ErrorKind,
    /// Whether a caller-visible recovery path exists
    pub recoverable: bool,
    /// Whether another attempt could succeed
    pub retryable: bool,
    /// A repaired locator to substitute before the next attempt
    pub repair_suggestion: Option<String>,
}

impl ErrorClassification {
    /// A terminal classification: no retry, no recovery
    #[inline]
    #[must_use]
    pub fn terminal(kind: ErrorKind) -> Self {
        Self {
            kind,
            recoverable: false,
            retryable: false,
            repair_suggestion: None,
        }
    }

    /// A retryable classification with no repair
    #[inline]
    #[must_use]
    pub fn retryable(kind: ErrorKind) -> Self {
        Self {
            kind,
            recoverable: true,
            retryable: true,
            repair_suggestion: None,
        }
    }

    /// Attach a repaired locator suggestion
    #[inline]
    #[must_use]
    pub fn with_repair(mut self, suggestion: impl Into<String>) -> Self {
        self.repair_suggestion = Some(suggestion.into());
        self.recoverable = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_match_variants() {
        assert_eq!(
            AnalysisError::InvalidLocator(String::new()).kind(),
            ErrorKind::InvalidLocator
        );
        assert_eq!(
            AnalysisError::Timeout {
                operation: "face".to_string(),
                elapsed_ms: 500
            }
            .kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            AnalysisError::AlreadyProcessing(ImageId::new("img")).kind(),
            ErrorKind::AlreadyProcessing
        );
    }

    #[test]
    fn persist_failed_classifies_as_processing_failed() {
        let result = AnalysisResult::assemble(
            ImageId::new("img"),
            "/p.jpg",
            std::collections::HashMap::new(),
            1,
            "v1",
        );
        let err = AnalysisError::PersistFailed {
            image_id: ImageId::new("img"),
            message: "sink unavailable".to_string(),
            result: Box::new(result),
        };
        assert_eq!(err.kind(), ErrorKind::ProcessingFailed);
        assert!(err.into_partial_result().is_some());
    }

    #[test]
    fn classification_builders() {
        let c = ErrorClassification::terminal(ErrorKind::FileNotFound);
        assert!(!c.retryable);
        assert!(!c.recoverable);

        let c = ErrorClassification::retryable(ErrorKind::Timeout);
        assert!(c.retryable);

        let c = ErrorClassification::terminal(ErrorKind::PathCorruption)
            .with_repair("/photos/fixed.jpg");
        assert!(c.recoverable);
        assert_eq!(c.repair_suggestion.as_deref(), Some("/photos/fixed.jpg"));
    }

    #[test]
    fn error_display_is_lowercase() {
        let err = AnalysisError::FileNotFound("/p.jpg".to_string());
        assert!(err.to_string().starts_with("file not found"));
    }
}
