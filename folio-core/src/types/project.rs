//! Portfolio projects.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_PROJECT_YEAR, MIN_PROJECT_YEAR};
use crate::error::{FolioError, Result};
use crate::types::{require_text, validate_slug};

/// A built or unbuilt work shown in the portfolio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier (assigned by the store)
    pub id: u64,
    /// URL identifier, unique among projects
    pub slug: String,
    /// Display title
    pub title: String,
    /// Slug of the category this project is filed under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// One-paragraph teaser for listings
    #[serde(default)]
    pub summary: String,
    /// Full description (markdown)
    #[serde(default)]
    pub body: String,
    /// City / site of the project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Completion year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    /// Public URL of the cover image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// Public URLs of gallery images, in display order
    #[serde(default)]
    pub gallery: Vec<String>,
    /// Shown on the home page
    #[serde(default)]
    pub featured: bool,
    /// Visible on the public site
    #[serde(default)]
    pub published: bool,
    /// Manual sort key (ascending)
    #[serde(default)]
    pub position: u32,
    /// Unix timestamp of creation
    #[serde(default)]
    pub created_at: u64,
    /// Unix timestamp of last update
    #[serde(default)]
    pub updated_at: u64,
}

impl Project {
    /// Creates an unpublished draft project.
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: 0, // Assigned by store
            slug: slug.into(),
            title: title.into(),
            category: None,
            summary: String::new(),
            body: String::new(),
            location: None,
            year: None,
            cover_image: None,
            gallery: Vec::new(),
            featured: false,
            published: false,
            position: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Files the project under a category.
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Marks the project as published.
    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }

    /// Marks the project as featured.
    pub fn featured(mut self) -> Self {
        self.featured = true;
        self
    }

    /// Validates slug, title, category reference, and year.
    pub fn validate(&self) -> Result<()> {
        validate_slug(&self.slug)?;
        require_text("project title", &self.title)?;

        if let Some(category) = &self.category {
            validate_slug(category)?;
        }

        if let Some(year) = self.year {
            if !(MIN_PROJECT_YEAR..=MAX_PROJECT_YEAR).contains(&year) {
                return Err(FolioError::ValidationError(format!(
                    "project year {} outside {}..={}",
                    year, MIN_PROJECT_YEAR, MAX_PROJECT_YEAR
                )));
            }
        }

        Ok(())
    }

    /// Returns true if the project is shown on the home page.
    pub fn is_featured(&self) -> bool {
        self.published && self.featured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let project = Project::new("casa-verde", "Casa Verde")
            .in_category("residential")
            .published()
            .featured();

        assert_eq!(project.category.as_deref(), Some("residential"));
        assert!(project.is_featured());
        assert!(project.validate().is_ok());
    }

    #[test]
    fn test_featured_requires_published() {
        let project = Project::new("casa-verde", "Casa Verde").featured();
        assert!(!project.is_featured());
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let project = Project::new("casa-verde", "   ");
        assert!(matches!(project.validate(), Err(FolioError::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_bad_category() {
        let project = Project::new("casa-verde", "Casa Verde").in_category("Residential Work");
        assert!(matches!(project.validate(), Err(FolioError::InvalidSlug(_))));
    }

    #[test]
    fn test_validate_year_range() {
        let mut project = Project::new("casa-verde", "Casa Verde");
        project.year = Some(2021);
        assert!(project.validate().is_ok());

        project.year = Some(1200);
        assert!(project.validate().is_err());
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{"id":3,"slug":"loft","title":"Loft"}"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.id, 3);
        assert!(project.gallery.is_empty());
        assert!(!project.published);
    }
}
