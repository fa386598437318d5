//! Free-form site pages ("about", "studio", "contact").

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{require_text, validate_slug};

/// An editable page of the public site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Unique identifier (assigned by the store)
    pub id: u64,
    /// URL identifier, unique among pages
    pub slug: String,
    /// Display title
    pub title: String,
    /// Page content (markdown)
    #[serde(default)]
    pub body: String,
    /// Visible on the public site
    #[serde(default)]
    pub published: bool,
    /// Unix timestamp of last update
    #[serde(default)]
    pub updated_at: u64,
}

impl Page {
    /// Creates an unpublished page.
    pub fn new(slug: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: 0,
            slug: slug.into(),
            title: title.into(),
            body: body.into(),
            published: false,
            updated_at: 0,
        }
    }

    /// Validates slug and title.
    pub fn validate(&self) -> Result<()> {
        validate_slug(&self.slug)?;
        require_text("page title", &self.title)
    }
}
