//! Cache Module
//!
//! Provides an in-memory object cache with size-bounded LRU eviction,
//! shared across all proxy connections.

use std::sync::Arc;

use tokio::sync::RwLock;

mod entry;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Maximum total bytes held across all resident entries
pub const MAX_CACHE_SIZE: usize = 1_049_000;

/// Responses of this many bytes or more are relayed but never cached
pub const MAX_OBJECT_SIZE: usize = 100_000;

/// Number of hash buckets indexing the resident entries
pub(crate) const BUCKET_COUNT: usize = 97;

// == Shared Handle ==
/// Thread-safe cache handle passed into every connection handler.
///
/// Any operation that mutates shared structure (insert, eviction, or a
/// lookup that promotes recency) must go through the write half of the
/// lock; only genuinely read-only inspection such as statistics reporting
/// may use the read half.
pub type SharedCache = Arc<RwLock<CacheStore>>;
