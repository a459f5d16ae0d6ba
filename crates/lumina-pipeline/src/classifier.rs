//! Failure classification
//!
//! Assigns every failure one taxonomy kind plus recoverability and
//! retryability flags, and proposes a repaired locator where a
//! deterministic fix exists. Classification is derived fresh per failure.
//!
//! Structured errors carry their kind from the point of failure; raw
//! platform error strings are translated exactly once, at the adapter
//! boundary, via [`ErrorClassifier::classify_raw`].

use lumina_path::PathResolver;
use lumina_types::{AnalysisError, ErrorClassification, ErrorKind};

/// Classifies failures against the request's original locator
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier {
    resolver: PathResolver,
}

impl ErrorClassifier {
    /// Create a classifier
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolver: PathResolver::new(),
        }
    }

    /// Classify a structured pipeline error
    ///
    /// Rules, in priority order:
    /// 1. `PathCorruption`: retryable only when a deterministic fix exists
    /// 2. `FileNotFound`: promoted to `PathCorruption` when the error text
    ///    carries a corruption signature against the request locator,
    ///    otherwise terminal
    /// 3. `InvalidImage`: terminal
    /// 4. `Timeout`: retryable
    /// 5. `ProcessingFailed`: retryable
    /// 6. everything else: terminal
    #[must_use]
    pub fn classify(&self, error: &AnalysisError, source_locator: &str) -> ErrorClassification {
        match error.kind() {
            ErrorKind::PathCorruption => {
                let target = match error {
                    AnalysisError::PathCorruption { locator, .. } => locator.as_str(),
                    _ => source_locator,
                };
                self.corruption_classification(target)
            }
            ErrorKind::FileNotFound => {
                let report = self
                    .resolver
                    .detect_corruption(source_locator, &error.to_string());
                if !report.is_corrupted {
                    return ErrorClassification::terminal(ErrorKind::FileNotFound);
                }
                match self.resolver.attempt_fix(source_locator) {
                    Some(fixed) => ErrorClassification::retryable(ErrorKind::PathCorruption)
                        .with_repair(fixed),
                    // The drift is on the error side; the intact request
                    // locator is the repair candidate.
                    None => ErrorClassification::retryable(ErrorKind::PathCorruption)
                        .with_repair(source_locator),
                }
            }
            ErrorKind::InvalidImage => ErrorClassification::terminal(ErrorKind::InvalidImage),
            ErrorKind::Timeout => ErrorClassification::retryable(ErrorKind::Timeout),
            ErrorKind::ProcessingFailed => {
                ErrorClassification::retryable(ErrorKind::ProcessingFailed)
            }
            kind @ (ErrorKind::InvalidLocator
            | ErrorKind::AlreadyProcessing
            | ErrorKind::Unknown) => ErrorClassification::terminal(kind),
        }
    }

    /// Translate a raw platform/stage error message into the taxonomy
    ///
    /// The single place where string matching on error text is allowed;
    /// everything past this boundary works with structured kinds.
    #[must_use]
    pub fn classify_raw(&self, message: &str, source_locator: &str) -> AnalysisError {
        let lower = message.to_lowercase();

        if lower.contains("no such file")
            || lower.contains("not found")
            || lower.contains("enoent")
            || lower.contains("filenotfound")
        {
            let report = self.resolver.detect_corruption(source_locator, message);
            if report.is_corrupted {
                return AnalysisError::PathCorruption {
                    locator: source_locator.to_string(),
                    detail: report
                        .suggestion
                        .unwrap_or_else(|| "corruption signature in error text".to_string()),
                };
            }
            return AnalysisError::FileNotFound(source_locator.to_string());
        }

        if lower.contains("invalid image")
            || lower.contains("corrupt image")
            || lower.contains("decode")
            || lower.contains("unsupported format")
        {
            return AnalysisError::InvalidImage(message.to_string());
        }

        if lower.contains("timed out") || lower.contains("timeout") || lower.contains("deadline") {
            return AnalysisError::Timeout {
                operation: message.to_string(),
                elapsed_ms: 0,
            };
        }

        if lower.contains("failed") || lower.contains("error") {
            return AnalysisError::ProcessingFailed(message.to_string());
        }

        AnalysisError::Unknown(message.to_string())
    }

    /// Corruption classification: retryable only when a fix is derivable
    fn corruption_classification(&self, locator: &str) -> ErrorClassification {
        match self.resolver.attempt_fix(locator) {
            Some(fixed) => ErrorClassification::retryable(ErrorKind::PathCorruption)
                .with_repair(fixed),
            None => ErrorClassification::terminal(ErrorKind::PathCorruption),
        }
    }
}
