//! Local-disk storage for uploaded images and documents.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use folio_core::constants::{ALLOWED_MEDIA_EXTENSIONS, DEFAULT_MEDIA_MAX_BYTES, MEDIA_URL_PREFIX};
use folio_core::error::{FolioError, Result};
use folio_core::types::slugify;

/// A file held by the media library.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoredMedia {
    /// File name on disk (unique)
    pub file_name: String,
    /// Public URL the site serves the file under
    pub url: String,
    /// Size in bytes
    pub size: u64,
    /// MIME type derived from the extension
    pub content_type: &'static str,
}

/// Uploaded files stored flat under one directory.
///
/// Stored names are `<uuid>-<slugified stem>.<ext>`, so uploads never collide
/// and never carry path components from the client.
pub struct MediaLibrary {
    root: PathBuf,
    max_bytes: usize,
}

impl MediaLibrary {
    /// Creates a library rooted at `root` with the default size cap.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_max_bytes(root, DEFAULT_MEDIA_MAX_BYTES)
    }

    /// Creates a library with a custom upload size cap.
    pub fn with_max_bytes(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// Returns the storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL for a stored file name.
    pub fn url_for(file_name: &str) -> String {
        format!("{}/{}", MEDIA_URL_PREFIX, file_name)
    }

    /// Stores an upload and returns where it lives.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredMedia> {
        if bytes.is_empty() {
            return Err(FolioError::MediaError("upload is empty".into()));
        }
        if bytes.len() > self.max_bytes {
            return Err(FolioError::MediaError(format!(
                "upload is {} bytes, limit is {}",
                bytes.len(),
                self.max_bytes
            )));
        }

        let (stem, extension) = split_name(original_name)?;
        let stem = match slugify(stem) {
            s if s.is_empty() => "file".to_string(),
            s => s,
        };
        let file_name = format!("{}-{}.{}", Uuid::new_v4().simple(), stem, extension);

        fs::create_dir_all(&self.root).await?;
        let path = self.root.join(&file_name);
        let temp_path = path.with_extension("part");

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &path).await?;

        info!(file_name = %file_name, "Stored upload");
        Ok(StoredMedia {
            url: Self::url_for(&file_name),
            size: bytes.len() as u64,
            content_type: content_type(&extension),
            file_name,
        })
    }

    /// Deletes a stored file. Returns false if it did not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, file_name: &str) -> Result<bool> {
        check_file_name(file_name)?;

        match fs::remove_file(self.root.join(file_name)).await {
            Ok(()) => {
                debug!("Deleted upload");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists stored files sorted by name.
    pub async fn list(&self) -> Result<Vec<StoredMedia>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut media = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            // Skips in-flight uploads and foreign files
            let extension = match split_name(&file_name) {
                Ok((_, ext)) => ext,
                Err(_) => continue,
            };
            media.push(StoredMedia {
                url: Self::url_for(&file_name),
                size: metadata.len(),
                content_type: content_type(&extension),
                file_name,
            });
        }

        media.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(media)
    }
}

/// Splits `name` into stem and lowercased extension, rejecting disallowed types.
fn split_name(name: &str) -> Result<(&str, String)> {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let (stem, extension) = base
        .rsplit_once('.')
        .ok_or_else(|| FolioError::MediaError(format!("'{}' has no file extension", name)))?;

    let extension = extension.to_ascii_lowercase();
    if !ALLOWED_MEDIA_EXTENSIONS.contains(&extension.as_str()) {
        return Err(FolioError::MediaError(format!(
            "file type '.{}' is not accepted",
            extension
        )));
    }
    Ok((stem, extension))
}

fn check_file_name(file_name: &str) -> Result<()> {
    let unsafe_name = file_name.is_empty()
        || file_name.starts_with('.')
        || file_name.contains(|c: char| c == '/' || c == '\\')
        || file_name.contains("..");
    if unsafe_name {
        return Err(FolioError::MediaError(format!("invalid file name '{}'", file_name)));
    }
    Ok(())
}

fn content_type(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
