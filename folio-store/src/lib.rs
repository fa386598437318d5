//! # Folio Store
//!
//! Storage backends behind the [`ContentStore`](folio_core::ContentStore) trait,
//! plus the local-disk media library for uploads.
//!
//! - **Memory**: concurrent maps for development and testing
//! - **File**: JSON snapshot on local disk for single-node deployments
//! - **Media**: uploaded images and documents stored under one directory
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_store::{FileStore, ContentStore};
//!
//! let store = FileStore::new("data/content.json").await?;
//! let saved = store.save_project(project).await?;
//! let all = store.list_projects().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod file;
mod media;
mod memory;

pub use file::FileStore;
pub use media::{MediaLibrary, StoredMedia};
pub use memory::{ContentSnapshot, MemoryStore};

// Re-export the trait from core
pub use folio_core::traits::ContentStore;
