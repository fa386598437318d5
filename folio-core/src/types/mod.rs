//! Domain types for the studio's content.

mod category;
mod page;
mod project;

pub use category::Category;
pub use page::Page;
pub use project::Project;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_SLUG_LEN;
use crate::error::{FolioError, Result};

/// Seconds since the Unix epoch.
pub fn now_timestamp() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Checks that `slug` is URL-safe: lowercase ASCII letters, digits, and
/// single hyphens, without a leading or trailing hyphen.
pub fn validate_slug(slug: &str) -> Result<()> {
    let well_formed = !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--");

    if well_formed {
        Ok(())
    } else {
        Err(FolioError::InvalidSlug(slug.to_string()))
    }
}

/// Derives a slug from free text ("Villa Sul Lago, 2019" → "villa-sul-lago-2019").
///
/// Characters other than ASCII letters and digits act as separators.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FolioError::ValidationError(format!("{} cannot be empty", field)));
    }
    Ok(())
}

/// Aggregate counts over the stored content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentStats {
    /// Total projects
    pub projects: u64,
    /// Projects visible on the public site
    pub published_projects: u64,
    /// Published projects flagged as featured
    pub featured_projects: u64,
    /// Total categories
    pub categories: u64,
    /// Total pages
    pub pages: u64,
}
