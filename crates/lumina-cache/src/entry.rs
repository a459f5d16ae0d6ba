//! Cache entries, configuration, and stats

use chrono::{DateTime, Utc};
use lumina_types::ImageId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One cached image reference
///
/// Owned and mutated exclusively by the cache: `last_accessed_at` moves on
/// every hit, nothing else changes after insertion. All fields round-trip
/// exactly through the persisted index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Image this entry caches
    pub image_id: ImageId,
    /// The locator the entry was materialized from
    pub original_locator: String,
    /// The resolved, stage-runner-consumable locator
    pub cached_locator: String,
    /// Size charged against the byte budget
    pub size_bytes: u64,
    /// When the entry was materialized; drives TTL expiry
    pub created_at: DateTime<Utc>,
    /// Last hit; drives LRU eviction order
    pub last_accessed_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether this entry is still within its TTL
    #[must_use]
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.created_at);
        match chrono::Duration::from_std(max_age) {
            Ok(max) => age <= max,
            Err(_) => true, // unrepresentably large TTL never expires
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Where the serialized index lives
    pub index_path: PathBuf,
    /// TTL for entries; stale entries are rematerialized on lookup
    pub max_age: Duration,
    /// Total size budget; exceeding it evicts least-recently-used entries
    pub max_total_bytes: u64,
}

impl CacheConfig {
    /// Default TTL: one week
    pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);
    /// Default budget: 500 MB
    pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 500 * 1024 * 1024;

    /// Configuration with defaults, rooted at the given index file
    #[must_use]
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            max_age: Self::DEFAULT_MAX_AGE,
            max_total_bytes: Self::DEFAULT_MAX_TOTAL_BYTES,
        }
    }

    /// With a TTL
    #[inline]
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// With a byte budget
    #[inline]
    #[must_use]
    pub fn with_max_total_bytes(mut self, max_total_bytes: u64) -> Self {
        self.max_total_bytes = max_total_bytes;
        self
    }
}

/// Cache observability snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Number of live entries
    pub entry_count: usize,
    /// Bytes charged against the budget
    pub total_bytes: u64,
    /// Creation time of the oldest entry
    pub oldest: Option<DateTime<Utc>>,
    /// Creation time of the newest entry
    pub newest: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(created_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            image_id: ImageId::new("img"),
            original_locator: "/p.jpg".to_string(),
            cached_locator: "/p.jpg".to_string(),
            size_bytes: 10,
            created_at,
            last_accessed_at: created_at,
        }
    }

    #[test]
    fn freshness_respects_max_age() {
        let now = Utc::now();
        let e = entry(now - chrono::Duration::seconds(30));
        assert!(e.is_fresh(Duration::from_secs(60), now));
        assert!(!e.is_fresh(Duration::from_secs(10), now));
    }

    #[test]
    fn entry_serde_round_trips_all_fields() {
        let e = entry(Utc::now());
        let json = serde_json::to_string(&e).unwrap();
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }

    #[test]
    fn config_builders() {
        let config = CacheConfig::new("/tmp/index.json")
            .with_max_age(Duration::from_secs(5))
            .with_max_total_bytes(1024);
        assert_eq!(config.max_age, Duration::from_secs(5));
        assert_eq!(config.max_total_bytes, 1024);
    }
}
