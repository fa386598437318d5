//! Runtime configuration: data directory, connection limits, cache TTLs.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use folio_cache::CacheConfig;
use folio_core::constants::DEFAULT_MEDIA_MAX_BYTES;
use folio_core::error::{FolioError, Result};
use folio_limiter::LimiterConfig;

const DEFAULT_DATA_DIR: &str = "data";

/// Runtime settings, read from `FOLIO_*` environment variables.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FolioConfig {
    /// Directory holding the content snapshot and uploads
    pub data_dir: PathBuf,
    /// Backing-store connection slots and acquire timeout
    pub limiter: LimiterConfig,
    /// Cache capacity and TTLs
    pub cache: CacheConfig,
    /// Upload size cap in bytes
    pub media_max_bytes: usize,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.into(),
            limiter: LimiterConfig::default(),
            cache: CacheConfig::default(),
            media_max_bytes: DEFAULT_MEDIA_MAX_BYTES,
        }
    }
}

impl FolioConfig {
    /// Reads configuration from the environment, loading `.env` first.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            data_dir: lookup("FOLIO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            limiter: LimiterConfig {
                max_slots: parse_var(&lookup, "FOLIO_DB_MAX_CONNECTIONS", defaults.limiter.max_slots)?,
                acquire_timeout_ms: parse_var(
                    &lookup,
                    "FOLIO_DB_ACQUIRE_TIMEOUT_MS",
                    defaults.limiter.acquire_timeout_ms,
                )?,
            },
            cache: CacheConfig {
                max_entries: parse_var(&lookup, "FOLIO_CACHE_MAX_ENTRIES", defaults.cache.max_entries)?,
                default_ttl_seconds: parse_var(
                    &lookup,
                    "FOLIO_CACHE_TTL_SECS",
                    defaults.cache.default_ttl_seconds,
                )?,
                fallback_ttl_seconds: parse_var(
                    &lookup,
                    "FOLIO_CACHE_FALLBACK_TTL_SECS",
                    defaults.cache.fallback_ttl_seconds,
                )?,
                auto_cleanup: defaults.cache.auto_cleanup,
            },
            media_max_bytes: parse_var(&lookup, "FOLIO_MEDIA_MAX_BYTES", defaults.media_max_bytes)?,
        };

        config.limiter.validate()?;
        Ok(config)
    }

    /// Path of the JSON content snapshot.
    pub fn content_path(&self) -> PathBuf {
        self.data_dir.join("content.json")
    }

    /// Directory for uploaded media.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

fn parse_var<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| FolioError::ConfigError(format!("{} has invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}
