//! # Folio Content
//!
//! Data access for the Folio site: a TTL cache in front of the content store
//! and a connection limiter bounding concurrent store access.
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_content::AppState;
//!
//! let state = AppState::from_env().await?;
//! let featured = state.content.featured_projects().await?;
//! state.shutdown().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;
mod keys;
mod service;
mod state;

pub use config::FolioConfig;
pub use service::{ContentService, ServiceStatus};
pub use state::AppState;
