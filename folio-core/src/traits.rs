//! Common traits for Folio.
//!
//! The data-access layer talks to storage only through these interfaces, so
//! backends can be swapped for tests or deployments.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Category, ContentStats, Page, Project};

// ═══════════════════════════════════════════════════════════════════════════════
// CONTENT STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for content storage.
///
/// Implementations might use:
/// - In-memory maps (tests, development)
/// - A JSON snapshot on local disk (single-node deployments)
/// - A relational database
///
/// `save_*` methods validate the record, assign an id when `id == 0`, reject a
/// slug owned by a different record, and return the stored record. Lists are
/// ordered by `position`, then slug.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Returns every project, published or not.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Looks up a project by slug.
    async fn get_project(&self, slug: &str) -> Result<Option<Project>>;

    /// Inserts or updates a project.
    async fn save_project(&self, project: Project) -> Result<Project>;

    /// Deletes a project. Returns false if it did not exist.
    async fn delete_project(&self, slug: &str) -> Result<bool>;

    /// Returns every category.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Inserts or updates a category.
    async fn save_category(&self, category: Category) -> Result<Category>;

    /// Deletes a category.
    ///
    /// Fails while any project is still filed under it.
    async fn delete_category(&self, slug: &str) -> Result<bool>;

    /// Returns every page.
    async fn list_pages(&self) -> Result<Vec<Page>>;

    /// Looks up a page by slug.
    async fn get_page(&self, slug: &str) -> Result<Option<Page>>;

    /// Inserts or updates a page.
    async fn save_page(&self, page: Page) -> Result<Page>;

    /// Deletes a page. Returns false if it did not exist.
    async fn delete_page(&self, slug: &str) -> Result<bool>;

    /// Returns aggregate counts.
    async fn stats(&self) -> Result<ContentStats>;
}
