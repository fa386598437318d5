//! Project categories.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{require_text, validate_slug};

/// A grouping of projects ("Residential", "Cultural", ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier (assigned by the store)
    pub id: u64,
    /// URL identifier, unique among categories
    pub slug: String,
    /// Display name
    pub name: String,
    /// Optional intro text for the category page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Manual sort key (ascending)
    #[serde(default)]
    pub position: u32,
}

impl Category {
    /// Creates a category.
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            slug: slug.into(),
            name: name.into(),
            description: None,
            position: 0,
        }
    }

    /// Validates slug and name.
    pub fn validate(&self) -> Result<()> {
        validate_slug(&self.slug)?;
        require_text("category name", &self.name)
    }
}
