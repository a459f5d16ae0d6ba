//! Locator resolution and normalization
//!
//! Turns a raw image locator string into a normalized form the stage
//! runners can consume. Three locator families are recognized:
//! - absolute file paths (normalized)
//! - scheme-qualified locators (`content://` and `asset://` pass through
//!   untouched; `file://` is unwrapped into the absolute family)
//! - remote locators (`http://` and `https://` pass through)
//!
//! Resolution fails fast on locators embedding an identifier whose length
//! deviates from the canonical 36 characters, rather than handing a
//! likely-wrong path downstream.

use crate::corruption::{self, CorruptionReport, CANONICAL_IDENT_LEN};
use lumina_types::AnalysisError;

/// Locator family a resolved locator belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorFamily {
    /// Absolute path on local storage
    LocalFile,
    /// Platform scheme the stage runners handle natively
    SchemeQualified,
    /// Remote URL fetched by the stage runners
    Remote,
}

/// A normalized, stage-runner-consumable locator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedLocator {
    family: LocatorFamily,
    value: String,
}

impl ResolvedLocator {
    /// The family this locator was classified into
    #[inline]
    #[must_use]
    pub fn family(&self) -> LocatorFamily {
        self.family
    }

    /// Borrow the normalized locator string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Consume into the normalized locator string
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.value
    }
}

impl std::fmt::Display for ResolvedLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

/// Locator resolution errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum PathError {
    /// Input was empty, blank, or not in any recognized family
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    /// Embedded identifier length deviates from the canonical 36
    #[error("corrupt identifier in {locator}: {found_len} chars, expected {CANONICAL_IDENT_LEN}")]
    CorruptIdentifier {
        /// The offending locator
        locator: String,
        /// Observed identifier length
        found_len: usize,
    },
}

impl From<PathError> for AnalysisError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::InvalidLocator(locator) => AnalysisError::InvalidLocator(locator),
            PathError::CorruptIdentifier { locator, found_len } => AnalysisError::PathCorruption {
                locator,
                detail: format!("identifier is {found_len} chars, expected {CANONICAL_IDENT_LEN}"),
            },
        }
    }
}

/// Validates, classifies, and normalizes raw image locators
#[derive(Debug, Clone, Copy, Default)]
pub struct PathResolver;

impl PathResolver {
    /// Create a resolver
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolve a raw locator into a normalized, classified form
    ///
    /// # Errors
    /// - `PathError::InvalidLocator` for empty/blank or unrecognized input
    /// - `PathError::CorruptIdentifier` when an embedded identifier's
    ///   length deviates from the canonical 36 characters
    pub fn resolve(&self, locator: &str) -> Result<ResolvedLocator, PathError> {
        let trimmed = locator.trim();
        if trimmed.is_empty() {
            return Err(PathError::InvalidLocator(locator.to_string()));
        }

        self.check_identifier(trimmed)?;

        if let Some(rest) = trimmed.strip_prefix("file://") {
            return self.resolve_local(rest, trimmed);
        }
        if trimmed.starts_with("content://") || trimmed.starts_with("asset://") {
            return Ok(ResolvedLocator {
                family: LocatorFamily::SchemeQualified,
                value: trimmed.to_string(),
            });
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(ResolvedLocator {
                family: LocatorFamily::Remote,
                value: trimmed.to_string(),
            });
        }
        if trimmed.starts_with('/') {
            return self.resolve_local(trimmed, trimmed);
        }

        Err(PathError::InvalidLocator(locator.to_string()))
    }

    /// Compare an original locator with an observed error message
    ///
    /// See [`CorruptionReport`] for what is flagged.
    #[must_use]
    pub fn detect_corruption(&self, original: &str, error_text: &str) -> CorruptionReport {
        corruption::detect(original, error_text)
    }

    /// Apply the deterministic repair rules to a locator
    ///
    /// Returns the repaired locator, or `None` when no rule matched.
    #[must_use]
    pub fn attempt_fix(&self, locator: &str) -> Option<String> {
        corruption::attempt_fix(locator)
    }

    fn resolve_local(&self, path: &str, original: &str) -> Result<ResolvedLocator, PathError> {
        if !path.starts_with('/') {
            return Err(PathError::InvalidLocator(original.to_string()));
        }

        // Collapse redundant separators and "." segments. ".." is left
        // alone; truncated-path repair belongs to the corruption rules.
        let mut normalized = String::with_capacity(path.len());
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." {
                continue;
            }
            normalized.push('/');
            normalized.push_str(segment);
        }
        if normalized.is_empty() {
            return Err(PathError::InvalidLocator(original.to_string()));
        }

        Ok(ResolvedLocator {
            family: LocatorFamily::LocalFile,
            value: normalized,
        })
    }

    fn check_identifier(&self, locator: &str) -> Result<(), PathError> {
        if let Some(ident) = corruption::find_identifier(locator) {
            if ident.len() != CANONICAL_IDENT_LEN {
                return Err(PathError::CorruptIdentifier {
                    locator: locator.to_string(),
                    found_len: ident.len(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_locator_is_invalid() {
        let resolver = PathResolver::new();
        assert!(matches!(
            resolver.resolve(""),
            Err(PathError::InvalidLocator(_))
        ));
        assert!(matches!(
            resolver.resolve("   "),
            Err(PathError::InvalidLocator(_))
        ));
    }

    #[test]
    fn absolute_path_is_normalized() {
        let resolver = PathResolver::new();
        let resolved = resolver.resolve("/photos//2024/./trip/img.jpg").unwrap();
        assert_eq!(resolved.family(), LocatorFamily::LocalFile);
        assert_eq!(resolved.as_str(), "/photos/2024/trip/img.jpg");
    }

    #[test]
    fn file_scheme_unwraps_to_local() {
        let resolver = PathResolver::new();
        let resolved = resolver.resolve("file:///photos/img.jpg").unwrap();
        assert_eq!(resolved.family(), LocatorFamily::LocalFile);
        assert_eq!(resolved.as_str(), "/photos/img.jpg");
    }

    #[test]
    fn content_scheme_passes_through_unaltered() {
        let resolver = PathResolver::new();
        let raw = "content://media/external/images/1234";
        let resolved = resolver.resolve(raw).unwrap();
        assert_eq!(resolved.family(), LocatorFamily::SchemeQualified);
        assert_eq!(resolved.as_str(), raw);
    }

    #[test]
    fn remote_url_passes_through() {
        let resolver = PathResolver::new();
        let raw = "https://cdn.example.com/img.jpg";
        let resolved = resolver.resolve(raw).unwrap();
        assert_eq!(resolved.family(), LocatorFamily::Remote);
        assert_eq!(resolved.as_str(), raw);
    }

    #[test]
    fn relative_path_is_invalid() {
        let resolver = PathResolver::new();
        assert!(matches!(
            resolver.resolve("photos/img.jpg"),
            Err(PathError::InvalidLocator(_))
        ));
    }

    #[test]
    fn oversized_identifier_fails_fast() {
        let resolver = PathResolver::new();
        let bad = "/photos/5b6ff138b-65ba-4765-af3c-868da25d8a25.jpg";
        match resolver.resolve(bad) {
            Err(PathError::CorruptIdentifier { found_len, .. }) => assert_eq!(found_len, 37),
            other => panic!("expected corrupt identifier, got {other:?}"),
        }
    }

    #[test]
    fn canonical_identifier_resolves() {
        let resolver = PathResolver::new();
        let good = "/photos/5b6f138b-65ba-4765-af3c-868da25d8a25.jpg";
        assert!(resolver.resolve(good).is_ok());
    }

    #[test]
    fn path_error_maps_into_taxonomy() {
        let err: AnalysisError = PathError::InvalidLocator("x".to_string()).into();
        assert_eq!(err.kind(), lumina_types::ErrorKind::InvalidLocator);

        let err: AnalysisError = PathError::CorruptIdentifier {
            locator: "/p".to_string(),
            found_len: 37,
        }
        .into();
        assert_eq!(err.kind(), lumina_types::ErrorKind::PathCorruption);
    }
}
