//! File-based content store with persistence.
//!
//! Keeps content in a [`MemoryStore`] and writes a JSON snapshot to disk.
//! Suitable for single-node deployments where durability is needed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use folio_core::error::{FolioError, Result};
use folio_core::traits::ContentStore;
use folio_core::types::{Category, ContentStats, Page, Project};

use crate::memory::{ContentSnapshot, MemoryStore};

/// File-based content store.
///
/// # File Format
///
/// ```text
/// {"version": 1, "projects": [...], "categories": [...], "pages": [...]}
/// ```
///
/// Saves write a temporary file and rename it over the snapshot, so a crash
/// mid-save leaves the previous snapshot intact.
pub struct FileStore {
    /// Path to the snapshot file
    path: PathBuf,
    /// In-memory working set
    memory: MemoryStore,
    /// Whether there are unsaved changes
    dirty: AtomicBool,
    /// Save after this many writes
    auto_save_threshold: u64,
    /// Writes since last save
    writes_since_save: AtomicU64,
    /// Serializes snapshot writes
    save_lock: Mutex<()>,
}

impl FileStore {
    /// Opens the store at `path`, saving after every write.
    ///
    /// If the file exists it is loaded; otherwise the store starts empty and
    /// the file is created on first save.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_auto_save(path, 1).await
    }

    /// Opens the store, saving after every `threshold` writes.
    ///
    /// A threshold of 0 disables automatic saves; call [`flush`](Self::flush).
    pub async fn with_auto_save(path: impl AsRef<Path>, threshold: u64) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            memory: MemoryStore::new(),
            dirty: AtomicBool::new(false),
            auto_save_threshold: threshold,
            writes_since_save: AtomicU64::new(0),
            save_lock: Mutex::new(()),
        };

        if fs::try_exists(&store.path).await? {
            store.load().await?;
        }

        Ok(store)
    }

    /// Loads content from the snapshot file.
    #[instrument(skip(self), fields(path = ?self.path))]
    async fn load(&self) -> Result<()> {
        let contents = fs::read(&self.path).await.map_err(|e| {
            FolioError::IoError(std::io::Error::new(
                e.kind(),
                format!("Failed to open content file: {}", e),
            ))
        })?;

        let snapshot: ContentSnapshot = serde_json::from_slice(&contents)?;
        let imported = self.memory.import(snapshot)?;

        self.dirty.store(false, Ordering::SeqCst);
        info!(imported, "Loaded content snapshot");
        Ok(())
    }

    /// Writes the current content to disk.
    #[instrument(skip(self), fields(path = ?self.path))]
    pub async fn save(&self) -> Result<()> {
        let _guard = self.save_lock.lock().await;

        // Clear first: writes landing during the save mark it dirty again
        self.dirty.store(false, Ordering::SeqCst);
        self.writes_since_save.store(0, Ordering::SeqCst);

        let snapshot = self.memory.snapshot();
        let serialized = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Write atomically (write to temp, then rename)
        let temp_path = self.path.with_extension("tmp");
        let result = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&serialized).await?;
            file.sync_all().await?;
            fs::rename(&temp_path, &self.path).await
        }
        .await;

        if let Err(e) = result {
            self.dirty.store(true, Ordering::SeqCst);
            return Err(e.into());
        }

        debug!(bytes = serialized.len(), "Content snapshot saved");
        Ok(())
    }

    /// Checks if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Forces a save if dirty.
    pub async fn flush(&self) -> Result<()> {
        if self.is_dirty() {
            self.save().await?;
        }
        Ok(())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the underlying memory store.
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Records a write and saves once the threshold is reached.
    async fn after_write(&self) -> Result<()> {
        self.dirty.store(true, Ordering::SeqCst);
        let writes = self.writes_since_save.fetch_add(1, Ordering::SeqCst) + 1;
        if self.auto_save_threshold > 0 && writes >= self.auto_save_threshold {
            self.save().await?;
        }
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if self.is_dirty() {
            warn!(path = ?self.path, "FileStore dropped with unsaved changes");
        }
    }
}

#[async_trait]
impl ContentStore for FileStore {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.memory.list_projects().await
    }

    async fn get_project(&self, slug: &str) -> Result<Option<Project>> {
        self.memory.get_project(slug).await
    }

    async fn save_project(&self, project: Project) -> Result<Project> {
        let saved = self.memory.save_project(project).await?;
        self.after_write().await?;
        Ok(saved)
    }

    async fn delete_project(&self, slug: &str) -> Result<bool> {
        let removed = self.memory.delete_project(slug).await?;
        if removed {
            self.after_write().await?;
        }
        Ok(removed)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.memory.list_categories().await
    }

    async fn save_category(&self, category: Category) -> Result<Category> {
        let saved = self.memory.save_category(category).await?;
        self.after_write().await?;
        Ok(saved)
    }

    async fn delete_category(&self, slug: &str) -> Result<bool> {
        let removed = self.memory.delete_category(slug).await?;
        if removed {
            self.after_write().await?;
        }
        Ok(removed)
    }

    async fn list_pages(&self) -> Result<Vec<Page>> {
        self.memory.list_pages().await
    }

    async fn get_page(&self, slug: &str) -> Result<Option<Page>> {
        self.memory.get_page(slug).await
    }

    async fn save_page(&self, page: Page) -> Result<Page> {
        let saved = self.memory.save_page(page).await?;
        self.after_write().await?;
        Ok(saved)
    }

    async fn delete_page(&self, slug: &str) -> Result<bool> {
        let removed = self.memory.delete_page(slug).await?;
        if removed {
            self.after_write().await?;
        }
        Ok(removed)
    }

    async fn stats(&self) -> Result<ContentStats> {
        self.memory.stats().await
    }
}
