//! Bounded retry with capped exponential backoff
//!
//! Wraps a fallible async operation:
//! - at most `max_attempts` attempts
//! - backoff before each non-first attempt, capped at `max_delay_ms`
//! - classification-driven early exit on non-retryable failures
//! - locator repair between attempts when classification proposes one
//!
//! The executor never raises past its own boundary: callers always get a
//! total [`RetryOutcome`].

use crate::classifier::ErrorClassifier;
use lumina_types::AnalysisError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

/// Retry policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempt budget, including the first attempt
    pub max_attempts: u32,
    /// Backoff before the second attempt
    pub initial_delay_ms: u64,
    /// Multiplier applied per additional failure
    pub backoff_multiplier: f64,
    /// Backoff ceiling
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// Default policy: 3 attempts, 100ms doubling, 2s ceiling
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With an attempt budget
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// With an initial backoff
    #[inline]
    #[must_use]
    pub fn with_initial_delay_ms(mut self, initial_delay_ms: u64) -> Self {
        self.initial_delay_ms = initial_delay_ms;
        self
    }

    /// With a backoff multiplier
    #[inline]
    #[must_use]
    pub fn with_backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    /// With a backoff ceiling
    #[inline]
    #[must_use]
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// A policy with zero delays, for tests and latency-critical callers
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            backoff_multiplier: 1.0,
            max_delay_ms: 0,
        }
    }

    /// Backoff after `failures` completed failed attempts
    ///
    /// `min(initial * multiplier^(failures - 1), max)`.
    #[must_use]
    pub fn delay_after(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = self.backoff_multiplier.powi(failures.saturating_sub(1) as i32);
        let raw = (self.initial_delay_ms as f64 * factor).round() as u64;
        Duration::from_millis(raw.min(self.max_delay_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            backoff_multiplier: 2.0,
            max_delay_ms: 2_000,
        }
    }
}

/// Mutable context threaded through attempts
///
/// Carries the current locator; a `PathCorruption` classification with a
/// repair suggestion substitutes it before the next attempt.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Operation name, for logs
    pub operation: String,
    /// The locator the next attempt should use
    pub locator: String,
}

impl RetryContext {
    /// Create a context
    #[inline]
    pub fn new(operation: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            locator: locator.into(),
        }
    }
}

/// Total outcome of a retried operation
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// Final result: the success value or the last failure
    pub result: Result<T, AnalysisError>,
    /// Attempts consumed
    pub attempts: u32,
    /// Wall time across all attempts and backoffs
    pub elapsed_ms: u64,
}

impl<T> RetryOutcome<T> {
    /// Whether the operation eventually succeeded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs fallible async operations under a retry policy
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    classifier: ErrorClassifier,
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create an executor with the given policy
    #[inline]
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self {
            classifier: ErrorClassifier::new(),
            config,
        }
    }

    /// The policy this executor runs under
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `op` with bounded attempts and capped backoff
    ///
    /// `op` receives the current locator, which may have been repaired
    /// since the previous attempt. Never raises: exhaustion and early
    /// exit both surface through the returned outcome.
    pub async fn execute<T, F, Fut>(&self, mut ctx: RetryContext, op: F) -> RetryOutcome<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, AnalysisError>>,
    {
        let start = Instant::now();
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < max_attempts {
            if attempts > 0 {
                tokio::time::sleep(self.config.delay_after(attempts)).await;
            }
            attempts += 1;

            match op(ctx.locator.clone()).await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts,
                        elapsed_ms: start.elapsed().as_millis() as u64,
                    };
                }
                Err(error) => {
                    let classification = self.classifier.classify(&error, &ctx.locator);
                    tracing::debug!(
                        operation = %ctx.operation,
                        attempt = attempts,
                        kind = ?classification.kind,
                        retryable = classification.retryable,
                        "attempt failed"
                    );

                    if !classification.retryable {
                        return RetryOutcome {
                            result: Err(error),
                            attempts,
                            elapsed_ms: start.elapsed().as_millis() as u64,
                        };
                    }
                    if let Some(repaired) = classification.repair_suggestion {
                        tracing::warn!(
                            operation = %ctx.operation,
                            from = %ctx.locator,
                            to = %repaired,
                            "substituting repaired locator for next attempt"
                        );
                        ctx.locator = repaired;
                    }
                    last_error = Some(error);
                }
            }
        }

        RetryOutcome {
            result: Err(last_error.unwrap_or_else(|| {
                AnalysisError::Unknown("retry budget exhausted without an error".to_string())
            })),
            attempts,
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counter() -> Arc<AtomicU32> {
        Arc::new(AtomicU32::new(0))
    }

    #[test]
    fn delay_grows_and_is_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_after(1), Duration::from_millis(100));
        assert_eq!(config.delay_after(2), Duration::from_millis(200));
        assert_eq!(config.delay_after(3), Duration::from_millis(400));
        assert_eq!(config.delay_after(10), Duration::from_millis(2_000));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let executor = RetryExecutor::new(RetryConfig::immediate(5));
        let calls = counter();
        let calls_in = calls.clone();

        let outcome = executor
            .execute(RetryContext::new("stage", "/p.jpg"), move |_loc| {
                let calls = calls_in.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(AnalysisError::ProcessingFailed("flaky".to_string()))
                    } else {
                        Ok(42u32)
                    }
                }
            })
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.result.unwrap(), 42);
    }

    #[tokio::test]
    async fn non_retryable_stops_after_one_attempt() {
        let executor = RetryExecutor::new(RetryConfig::immediate(5));
        let calls = counter();
        let calls_in = calls.clone();

        let outcome: RetryOutcome<u32> = executor
            .execute(RetryContext::new("stage", "/p.jpg"), move |_loc| {
                let calls = calls_in.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(AnalysisError::InvalidImage("bad jpeg".to_string()))
                }
            })
            .await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error() {
        let executor = RetryExecutor::new(RetryConfig::immediate(3));
        let outcome: RetryOutcome<u32> = executor
            .execute(RetryContext::new("stage", "/p.jpg"), |_loc| async {
                Err(AnalysisError::Timeout {
                    operation: "stage".to_string(),
                    elapsed_ms: 10,
                })
            })
            .await;

        assert_eq!(outcome.attempts, 3);
        assert!(matches!(
            outcome.result,
            Err(AnalysisError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn repaired_locator_feeds_the_next_attempt() {
        const GOOD: &str = "/photos/5b6f138b-65ba-4765-af3c-868da25d8a25.jpg";
        const BAD: &str = "/photos/5b6ff138b-65ba-4765-af3c-868da25d8a25.jpg";

        let executor = RetryExecutor::new(RetryConfig::immediate(3));
        let outcome = executor
            .execute(RetryContext::new("stage", BAD), |loc| async move {
                if loc == GOOD {
                    Ok(loc)
                } else {
                    Err(AnalysisError::FileNotFound(loc))
                }
            })
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.result.unwrap(), GOOD);
    }
}
