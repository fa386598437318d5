//! # Folio Core
//!
//! Core types, errors, and traits shared by every Folio crate.
//!
//! - **Types**: projects, categories, pages, and slug handling
//! - **Errors**: one error enum for the whole workspace
//! - **Constants**: cache and connection defaults
//! - **Traits**: the content store interface the data-access layer consumes
//!
//! ## Example
//!
//! ```rust
//! use folio_core::{Project, slugify};
//!
//! let project = Project::new(slugify("Harbour Pavilion"), "Harbour Pavilion");
//! assert_eq!(project.slug, "harbour-pavilion");
//! assert!(project.validate().is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{FolioError, Result};
pub use traits::*;
pub use types::*;
