//! Error types for Folio.
//!
//! Every crate in the workspace reports failures through [`FolioError`].

use thiserror::Error;

/// Result type alias using `FolioError`.
pub type Result<T> = std::result::Result<T, FolioError>;

/// Main error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CONTENT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Slug is empty or contains characters outside `[a-z0-9-]`.
    #[error("Invalid slug '{0}'")]
    InvalidSlug(String),

    /// Requested content does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Slug is already owned by another record.
    #[error("Slug '{slug}' is already used by {kind} #{owner}")]
    DuplicateSlug {
        /// Record kind ("project", "category", "page")
        kind: &'static str,
        /// The conflicting slug
        slug: String,
        /// Id of the record that owns the slug
        owner: u64,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // CONNECTION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A queued connection request waited longer than the acquire timeout.
    #[error("Timed out after {waited_ms}ms waiting for a database connection slot")]
    ConnectionTimeout {
        /// How long the request was queued
        waited_ms: u64,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Backing store failure.
    #[error("Store error: {0}")]
    StoreError(String),

    /// Snapshot format version mismatch.
    #[error("Snapshot version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Version this build understands
        expected: u32,
        /// Version found on disk
        actual: u32,
    },

    /// Upload rejected or media file could not be handled.
    #[error("Media error: {0}")]
    MediaError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl FolioError {
    /// Returns true if retrying the operation later may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FolioError::ConnectionTimeout { .. }
                | FolioError::StoreError(_)
                | FolioError::IoError(_)
        )
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            FolioError::ValidationError(_)
                | FolioError::InvalidSlug(_)
                | FolioError::DuplicateSlug { .. }
                | FolioError::VersionMismatch { .. }
        )
    }
}
