//! Request identity types
//!
//! Defines the identifiers and the unit-of-work record the pipeline
//! operates on:
//! - Image and owner identifiers (newtypes over the caller's string ids)
//! - `AnalysisRequest`, one unit of analysis work

use serde::{Deserialize, Serialize};

/// Unique image identifier
///
/// The dedup and cache key. Must be unique per distinct image instance;
/// the pipeline never generates these, callers supply them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageId(pub String);

impl ImageId {
    /// Create an image id from any string-like value
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Owner identifier for attribution of committed results
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub String);

impl OwnerId {
    /// Create an owner id from any string-like value
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One unit of analysis work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Dedup/cache key for this image instance
    pub image_id: ImageId,
    /// Raw, possibly unnormalized locator for the image bytes
    pub source_locator: String,
    /// Owner the committed result is attributed to
    pub owner_id: OwnerId,
}

impl AnalysisRequest {
    /// Create a new request
    #[inline]
    pub fn new(
        image_id: impl Into<ImageId>,
        source_locator: impl Into<String>,
        owner_id: impl Into<OwnerId>,
    ) -> Self {
        Self {
            image_id: image_id.into(),
            source_locator: source_locator.into(),
            owner_id: owner_id.into(),
        }
    }
}

impl From<String> for ImageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<String> for OwnerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
