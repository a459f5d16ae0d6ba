//! Lumina Cache - resolved-image cache with a persisted index
//!
//! Maps image ids to locally resolved, time-bounded locators:
//! - TTL expiry (stale entries rematerialize on lookup)
//! - byte-budget LRU eviction
//! - JSON index persisted after every mutation, reloaded at open
//!
//! The cache is the sole owner and mutator of its entries; callers only
//! see locators and stats.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cache;
pub mod entry;

// Re-exports for convenience
pub use cache::{CacheError, ImageCache};
pub use entry::{CacheConfig, CacheEntry, CacheStats};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
