//! TTL cache for Folio.
//!
//! Generic in-memory cache with per-entry expiration, used to memoize
//! backing-store reads and to serve short-lived fallback data when a read fails.

mod cache;

pub use cache::{CacheConfig, CacheStats, TtlCache};
