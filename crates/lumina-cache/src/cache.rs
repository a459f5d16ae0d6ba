//! The image cache
//!
//! Maps an image id to a locally resolved, time-bounded locator:
//! - fresh hit: touch `last_accessed_at` and return the cached locator
//! - miss or stale entry: rematerialize, insert, evict LRU entries while
//!   over the byte budget
//! - the index is persisted after every mutation and reloaded (with eager
//!   TTL pruning) at open
//!
//! All index state lives behind one async mutex; mutation is strictly
//! single-writer.

use crate::entry::{CacheConfig, CacheEntry, CacheStats};
use chrono::Utc;
use lumina_path::{LocatorFamily, PathError, PathResolver, ResolvedLocator};
use lumina_types::{AnalysisError, ImageId};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Cache failure modes
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Locator failed validation
    #[error(transparent)]
    Resolve(#[from] PathError),

    /// Local file behind the locator does not exist
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Index or file-system I/O failed
    #[error("cache i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Index could not be serialized
    #[error("cache index serialization failed: {0}")]
    Index(#[from] serde_json::Error),
}

impl From<CacheError> for AnalysisError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Resolve(e) => e.into(),
            CacheError::FileNotFound(path) => AnalysisError::FileNotFound(path),
            CacheError::Io(e) => AnalysisError::ProcessingFailed(format!("cache i/o: {e}")),
            CacheError::Index(e) => AnalysisError::ProcessingFailed(format!("cache index: {e}")),
        }
    }
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct CacheIndex {
    entries: HashMap<ImageId, CacheEntry>,
}

impl CacheIndex {
    fn total_bytes(&self) -> u64 {
        self.entries.values().map(|e| e.size_bytes).sum()
    }
}

/// Image cache with TTL expiry, byte-budget LRU eviction, and a persisted
/// index
#[derive(Debug)]
pub struct ImageCache {
    config: CacheConfig,
    resolver: PathResolver,
    index: Mutex<CacheIndex>,
}

impl ImageCache {
    /// Open a cache, loading and pruning the persisted index
    ///
    /// Entries older than `max_age` are dropped eagerly. A corrupt index
    /// file is discarded with a warning rather than failing the open.
    ///
    /// # Errors
    /// `CacheError::Io` when the index file exists but cannot be read.
    pub async fn open(config: CacheConfig) -> Result<Self, CacheError> {
        let mut index = match tokio::fs::read(&config.index_path).await {
            Ok(bytes) => match serde_json::from_slice::<CacheIndex>(&bytes) {
                Ok(index) => index,
                Err(e) => {
                    tracing::warn!(error = %e, "cache index unreadable, starting empty");
                    CacheIndex::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheIndex::default(),
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now();
        let before = index.entries.len();
        index
            .entries
            .retain(|_, entry| entry.is_fresh(config.max_age, now));
        if index.entries.len() < before {
            tracing::debug!(
                dropped = before - index.entries.len(),
                "pruned expired cache entries at open"
            );
        }

        let cache = Self {
            config,
            resolver: PathResolver::new(),
            index: Mutex::new(index),
        };
        {
            let index = cache.index.lock().await;
            cache.persist(&index).await?;
        }
        Ok(cache)
    }

    /// Resolve an image to a usable locator, materializing on miss
    ///
    /// # Errors
    /// Propagates locator validation failures and missing local files.
    pub async fn resolve(
        &self,
        image_id: &ImageId,
        source_locator: &str,
    ) -> Result<String, CacheError> {
        let mut index = self.index.lock().await;
        let now = Utc::now();
        let mut evicted = false;

        let fresh_locator = match index.entries.get(image_id) {
            Some(entry) if entry.is_fresh(self.config.max_age, now) => {
                Some(entry.cached_locator.clone())
            }
            Some(_) => {
                tracing::debug!(image_id = %image_id, "cache entry expired");
                index.entries.remove(image_id);
                evicted = true;
                None
            }
            None => None,
        };

        if let Some(locator) = fresh_locator {
            if self.validate(&locator).await {
                if let Some(entry) = index.entries.get_mut(image_id) {
                    entry.last_accessed_at = now;
                }
                self.persist(&index).await?;
                tracing::debug!(image_id = %image_id, "cache hit");
                return Ok(locator);
            }
            // Entry no longer resolvable: evict, never return it.
            tracing::warn!(image_id = %image_id, "cached locator invalid, evicting");
            index.entries.remove(image_id);
            evicted = true;
        }

        let (resolved, size_bytes) = match self.materialize(source_locator).await {
            Ok(materialized) => materialized,
            Err(error) => {
                // The index file must reflect the eviction even when no
                // replacement entry is written.
                if evicted {
                    self.persist(&index).await?;
                }
                return Err(error);
            }
        };
        let cached_locator = resolved.into_string();
        index.entries.insert(
            image_id.clone(),
            CacheEntry {
                image_id: image_id.clone(),
                original_locator: source_locator.to_string(),
                cached_locator: cached_locator.clone(),
                size_bytes,
                created_at: now,
                last_accessed_at: now,
            },
        );

        self.evict_over_budget(&mut index);
        self.persist(&index).await?;
        Ok(cached_locator)
    }

    /// Drop one entry
    pub async fn invalidate(&self, image_id: &ImageId) -> Result<(), CacheError> {
        let mut index = self.index.lock().await;
        if index.entries.remove(image_id).is_some() {
            self.persist(&index).await?;
        }
        Ok(())
    }

    /// Drop every entry
    pub async fn clear(&self) -> Result<(), CacheError> {
        let mut index = self.index.lock().await;
        index.entries.clear();
        self.persist(&index).await
    }

    /// Observability snapshot
    pub async fn stats(&self) -> CacheStats {
        let index = self.index.lock().await;
        CacheStats {
            entry_count: index.entries.len(),
            total_bytes: index.total_bytes(),
            oldest: index.entries.values().map(|e| e.created_at).min(),
            newest: index.entries.values().map(|e| e.created_at).max(),
        }
    }

    /// Validate and size a source locator
    ///
    /// Minimal materialization contract: the source locator is validated
    /// and reused as the cached locator; local files are stat'd for their
    /// size, everything else is charged zero bytes.
    async fn materialize(
        &self,
        source_locator: &str,
    ) -> Result<(ResolvedLocator, u64), CacheError> {
        let resolved = self.resolver.resolve(source_locator)?;
        let size_bytes = match resolved.family() {
            LocatorFamily::LocalFile => match tokio::fs::metadata(resolved.as_str()).await {
                Ok(meta) => meta.len(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(CacheError::FileNotFound(resolved.as_str().to_string()));
                }
                Err(e) => return Err(e.into()),
            },
            LocatorFamily::SchemeQualified | LocatorFamily::Remote => 0,
        };
        Ok((resolved, size_bytes))
    }

    /// Whether a cached locator is still resolvable right now
    async fn validate(&self, cached_locator: &str) -> bool {
        match self.resolver.resolve(cached_locator) {
            Ok(resolved) => match resolved.family() {
                LocatorFamily::LocalFile => {
                    tokio::fs::metadata(resolved.as_str()).await.is_ok()
                }
                LocatorFamily::SchemeQualified | LocatorFamily::Remote => true,
            },
            Err(_) => false,
        }
    }

    /// Evict in ascending `last_accessed_at` order until back under budget
    fn evict_over_budget(&self, index: &mut CacheIndex) {
        while index.total_bytes() > self.config.max_total_bytes && !index.entries.is_empty() {
            let victim = index
                .entries
                .values()
                .min_by_key(|e| e.last_accessed_at)
                .map(|e| e.image_id.clone());
            let Some(victim) = victim else { break };
            tracing::warn!(image_id = %victim, "evicting cache entry over byte budget");
            index.entries.remove(&victim);
        }
    }

    async fn persist(&self, index: &CacheIndex) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(index)?;
        tokio::fs::write(&self.config.index_path, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        cache: ImageCache,
        photo_dir: std::path::PathBuf,
    }

    async fn fixture(config: impl FnOnce(CacheConfig) -> CacheConfig) -> Fixture {
        let dir = TempDir::new().unwrap();
        let photo_dir = dir.path().join("photos");
        std::fs::create_dir_all(&photo_dir).unwrap();
        let cache_config = config(CacheConfig::new(dir.path().join("index.json")));
        let cache = ImageCache::open(cache_config).await.unwrap();
        Fixture {
            _dir: dir,
            cache,
            photo_dir,
        }
    }

    fn write_photo(dir: &std::path::Path, name: &str, size: usize) -> String {
        let path = dir.join(name);
        std::fs::write(&path, vec![0u8; size]).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn fresh_hit_returns_same_locator() {
        let fx = fixture(|c| c).await;
        let locator = write_photo(&fx.photo_dir, "a.jpg", 16);
        let id = ImageId::new("a");

        let first = fx.cache.resolve(&id, &locator).await.unwrap();
        let second = fx.cache.resolve(&id, &locator).await.unwrap();
        assert_eq!(first, second);

        let stats = fx.cache.stats().await;
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.total_bytes, 16);
    }

    #[tokio::test]
    async fn expired_entry_is_rematerialized() {
        let fx = fixture(|c| c.with_max_age(Duration::ZERO)).await;
        let locator = write_photo(&fx.photo_dir, "a.jpg", 8);
        let id = ImageId::new("a");

        fx.cache.resolve(&id, &locator).await.unwrap();
        let first_stats = fx.cache.stats().await;

        tokio::time::sleep(Duration::from_millis(5)).await;
        fx.cache.resolve(&id, &locator).await.unwrap();
        let second_stats = fx.cache.stats().await;

        assert_eq!(second_stats.entry_count, 1);
        // Age reset: the entry was recreated, not touched.
        assert!(second_stats.newest.unwrap() > first_stats.newest.unwrap());
    }

    #[tokio::test]
    async fn eviction_drops_least_recently_used_first() {
        let fx = fixture(|c| c.with_max_total_bytes(25)).await;
        let a = write_photo(&fx.photo_dir, "a.jpg", 10);
        let b = write_photo(&fx.photo_dir, "b.jpg", 10);
        let c = write_photo(&fx.photo_dir, "c.jpg", 10);

        fx.cache.resolve(&ImageId::new("a"), &a).await.unwrap();
        fx.cache.resolve(&ImageId::new("b"), &b).await.unwrap();
        // Touch "a" so "b" becomes the LRU victim.
        fx.cache.resolve(&ImageId::new("a"), &a).await.unwrap();
        fx.cache.resolve(&ImageId::new("c"), &c).await.unwrap();

        let stats = fx.cache.stats().await;
        assert_eq!(stats.entry_count, 2);
        assert!(stats.total_bytes <= 25);

        // "b" was evicted; "a" survives and hits.
        assert_eq!(fx.cache.resolve(&ImageId::new("a"), &a).await.unwrap(), a);
    }

    #[tokio::test]
    async fn index_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let photo_dir = dir.path().join("photos");
        std::fs::create_dir_all(&photo_dir).unwrap();
        let index_path = dir.path().join("index.json");
        let locator = write_photo(&photo_dir, "a.jpg", 12);
        let id = ImageId::new("a");

        {
            let cache = ImageCache::open(CacheConfig::new(&index_path)).await.unwrap();
            cache.resolve(&id, &locator).await.unwrap();
        }

        let cache = ImageCache::open(CacheConfig::new(&index_path)).await.unwrap();
        let stats = cache.stats().await;
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.total_bytes, 12);
    }

    #[tokio::test]
    async fn reopen_prunes_expired_entries() {
        let dir = TempDir::new().unwrap();
        let photo_dir = dir.path().join("photos");
        std::fs::create_dir_all(&photo_dir).unwrap();
        let index_path = dir.path().join("index.json");
        let locator = write_photo(&photo_dir, "a.jpg", 12);

        {
            let cache = ImageCache::open(CacheConfig::new(&index_path)).await.unwrap();
            cache.resolve(&ImageId::new("a"), &locator).await.unwrap();
        }

        let cache = ImageCache::open(
            CacheConfig::new(&index_path).with_max_age(Duration::ZERO),
        )
        .await
        .unwrap();
        assert_eq!(cache.stats().await.entry_count, 0);
    }

    #[tokio::test]
    async fn missing_file_fails_with_not_found() {
        let fx = fixture(|c| c).await;
        let missing = fx.photo_dir.join("nope.jpg").to_string_lossy().into_owned();
        let result = fx.cache.resolve(&ImageId::new("x"), &missing).await;
        assert!(matches!(result, Err(CacheError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn stale_locator_is_evicted_not_returned() {
        let fx = fixture(|c| c).await;
        let locator = write_photo(&fx.photo_dir, "a.jpg", 8);
        let id = ImageId::new("a");

        fx.cache.resolve(&id, &locator).await.unwrap();
        std::fs::remove_file(&locator).unwrap();

        let result = fx.cache.resolve(&id, &locator).await;
        assert!(matches!(result, Err(CacheError::FileNotFound(_))));
        assert_eq!(fx.cache.stats().await.entry_count, 0);
    }

    #[tokio::test]
    async fn failed_rematerialization_persists_the_eviction() {
        let dir = TempDir::new().unwrap();
        let photo_dir = dir.path().join("photos");
        std::fs::create_dir_all(&photo_dir).unwrap();
        let index_path = dir.path().join("index.json");
        let locator = write_photo(&photo_dir, "a.jpg", 8);
        let id = ImageId::new("a");

        {
            let cache = ImageCache::open(CacheConfig::new(&index_path)).await.unwrap();
            cache.resolve(&id, &locator).await.unwrap();
            std::fs::remove_file(&locator).unwrap();
            assert!(cache.resolve(&id, &locator).await.is_err());
        }

        // The eviction reached the index file, not just memory.
        let cache = ImageCache::open(CacheConfig::new(&index_path)).await.unwrap();
        assert_eq!(cache.stats().await.entry_count, 0);
    }

    #[tokio::test]
    async fn invalidate_and_clear() {
        let fx = fixture(|c| c).await;
        let a = write_photo(&fx.photo_dir, "a.jpg", 4);
        let b = write_photo(&fx.photo_dir, "b.jpg", 4);

        fx.cache.resolve(&ImageId::new("a"), &a).await.unwrap();
        fx.cache.resolve(&ImageId::new("b"), &b).await.unwrap();

        fx.cache.invalidate(&ImageId::new("a")).await.unwrap();
        assert_eq!(fx.cache.stats().await.entry_count, 1);

        fx.cache.clear().await.unwrap();
        assert_eq!(fx.cache.stats().await.entry_count, 0);
    }

    #[tokio::test]
    async fn corrupt_index_starts_empty() {
        let dir = TempDir::new().unwrap();
        let index_path = dir.path().join("index.json");
        std::fs::write(&index_path, b"not json at all").unwrap();

        let cache = ImageCache::open(CacheConfig::new(&index_path)).await.unwrap();
        assert_eq!(cache.stats().await.entry_count, 0);
    }

    #[tokio::test]
    async fn scheme_qualified_locator_is_cached_unaltered() {
        let fx = fixture(|c| c).await;
        let raw = "content://media/external/images/99";
        let resolved = fx
            .cache
            .resolve(&ImageId::new("c"), raw)
            .await
            .unwrap();
        assert_eq!(resolved, raw);
        assert_eq!(fx.cache.stats().await.total_bytes, 0);
    }
}
