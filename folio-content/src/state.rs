//! App state: content service, store, media library.

use std::sync::Arc;

use tracing::info;

use folio_core::error::Result;
use folio_limiter::ConnectionLimiter;
use folio_store::{FileStore, MediaLibrary};

use crate::config::FolioConfig;
use crate::service::ContentService;

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    /// Settings the state was opened with
    pub config: FolioConfig,
    /// Cached content access
    pub content: ContentService,
    /// Uploaded files
    pub media: MediaLibrary,
    store: Arc<FileStore>,
}

impl AppState {
    /// Opens the content snapshot under the data directory and wires the
    /// service around it.
    pub async fn open(config: FolioConfig) -> Result<Self> {
        let store = Arc::new(FileStore::new(config.content_path()).await?);
        let limiter = Arc::new(ConnectionLimiter::new(config.limiter.clone())?);
        let content = ContentService::new(store.clone(), limiter, &config.cache);
        let media = MediaLibrary::with_max_bytes(config.uploads_dir(), config.media_max_bytes);

        info!(
            data_dir = ?config.data_dir,
            max_connections = config.limiter.max_slots,
            cache_ttl_secs = config.cache.default_ttl_seconds,
            "Folio state ready"
        );

        Ok(Self {
            config,
            content,
            media,
            store,
        })
    }

    /// Builds state from the environment.
    pub async fn from_env() -> Result<Self> {
        Self::open(FolioConfig::from_env()?).await
    }

    /// Writes any unsaved content to disk.
    pub async fn shutdown(&self) -> Result<()> {
        self.store.flush().await?;
        info!("Folio state flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::types::{Category, Page, Project};
    use tempfile::tempdir;

    fn config_in(dir: &std::path::Path) -> FolioConfig {
        FolioConfig {
            data_dir: dir.to_path_buf(),
            ..FolioConfig::default()
        }
    }

    #[tokio::test]
    async fn test_content_survives_restart() {
        let dir = tempdir().unwrap();

        {
            let state = AppState::open(config_in(dir.path())).await.unwrap();
            state
                .content
                .save_category(Category::new("civic", "Civic"))
                .await
                .unwrap();
            state
                .content
                .save_project(Project::new("town-hall", "Town Hall").in_category("civic").published())
                .await
                .unwrap();
            state
                .content
                .save_page(Page::new("contact", "Contact", "studio@example.com"))
                .await
                .unwrap();
            state.shutdown().await.unwrap();
        }

        let state = AppState::open(config_in(dir.path())).await.unwrap();
        assert_eq!(state.content.published_projects().await.unwrap().len(), 1);
        assert!(state.content.page("contact").await.unwrap().is_some());

        let stats = state.content.content_stats().await.unwrap();
        assert_eq!(stats.categories, 1);
        assert_eq!(stats.pages, 1);
    }

    #[tokio::test]
    async fn test_media_lives_under_data_dir() {
        let dir = tempdir().unwrap();
        let state = AppState::open(config_in(dir.path())).await.unwrap();

        let stored = state.media.store("elevation.jpg", b"jpeg").await.unwrap();

        assert!(dir.path().join("uploads").join(&stored.file_name).exists());
    }

    #[tokio::test]
    async fn test_status_starts_idle() {
        let dir = tempdir().unwrap();
        let state = AppState::open(config_in(dir.path())).await.unwrap();

        let status = state.content.status();
        assert_eq!(status.limiter.active, 0);
        assert_eq!(status.limiter.max_slots, 10);
        assert!(status.caches.values().all(|c| c.total_entries == 0));
    }
}
