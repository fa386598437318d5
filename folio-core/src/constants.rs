//! Defaults shared across the workspace.

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Default lifetime of a cached fetch result (5 minutes).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Lifetime of a fallback value cached after a failed fetch.
/// Kept short so a real fetch is retried soon.
pub const FALLBACK_CACHE_TTL_SECS: u64 = 30;

/// Default maximum number of entries held by one cache.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

// ═══════════════════════════════════════════════════════════════════════════════
// DATABASE CONNECTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default number of concurrent backing-store connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// How long a queued connection request waits before failing.
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

// ═══════════════════════════════════════════════════════════════════════════════
// CONTENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum slug length in bytes.
pub const MAX_SLUG_LEN: usize = 96;

/// Earliest accepted project year.
pub const MIN_PROJECT_YEAR: u16 = 1800;

/// Latest accepted project year.
pub const MAX_PROJECT_YEAR: u16 = 2200;

/// Current on-disk snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

// ═══════════════════════════════════════════════════════════════════════════════
// MEDIA
// ═══════════════════════════════════════════════════════════════════════════════

/// Default upload size cap (10 MiB).
pub const DEFAULT_MEDIA_MAX_BYTES: usize = 10 * 1024 * 1024;

/// File extensions accepted by the media library.
pub const ALLOWED_MEDIA_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "webp", "gif", "svg", "avif", "pdf"];

/// URL prefix under which uploaded files are served.
pub const MEDIA_URL_PREFIX: &str = "/uploads";
