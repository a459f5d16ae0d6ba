//! Lumina Path - locator resolution and corruption repair
//!
//! Validates raw image locator strings, normalizes them for the stage
//! runners, and detects/repairs the regular corruption patterns:
//! - drifted embedded identifier lengths
//! - duplicated file extensions
//!
//! # Example
//!
//! ```rust
//! use lumina_path::PathResolver;
//!
//! let resolver = PathResolver::new();
//! let resolved = resolver.resolve("/photos//vacation/./beach.jpg").unwrap();
//! assert_eq!(resolved.as_str(), "/photos/vacation/beach.jpg");
//!
//! let fixed = resolver.attempt_fix("/photos/sunset.jpg.jpg").unwrap();
//! assert_eq!(fixed, "/photos/sunset.jpg");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod corruption;
pub mod resolver;

// Re-exports for convenience
pub use corruption::{CorruptionKind, CorruptionReport, CANONICAL_IDENT_LEN};
pub use resolver::{LocatorFamily, PathError, PathResolver, ResolvedLocator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
