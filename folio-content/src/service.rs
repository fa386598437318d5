//! Data-access layer: cache in front, connection limiter behind.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use folio_cache::{CacheConfig, CacheStats, TtlCache};
use folio_core::error::{FolioError, Result};
use folio_core::traits::ContentStore;
use folio_core::types::{validate_slug, Category, ContentStats, Page, Project};
use folio_limiter::{ConnectionLimiter, LimiterStatus};

use crate::keys;

/// Health snapshot for the admin dashboard.
#[derive(Clone, Debug, Serialize)]
pub struct ServiceStatus {
    /// Connection slots in use and queued
    pub limiter: LimiterStatus,
    /// Per-cache entry counts
    pub caches: BTreeMap<&'static str, CacheStats>,
}

struct ContentCaches {
    project_lists: TtlCache<Vec<Project>>,
    projects: TtlCache<Option<Project>>,
    categories: TtlCache<Vec<Category>>,
    pages: TtlCache<Vec<Page>>,
    page: TtlCache<Option<Page>>,
}

impl ContentCaches {
    fn new(config: &CacheConfig) -> Self {
        Self {
            project_lists: TtlCache::with_config(config.clone()),
            projects: TtlCache::with_config(config.clone()),
            categories: TtlCache::with_config(config.clone()),
            pages: TtlCache::with_config(config.clone()),
            page: TtlCache::with_config(config.clone()),
        }
    }
}

/// Cached, connection-limited access to site content.
///
/// Every read consults the cache first. On a miss the store is queried while
/// holding a connection slot. List reads fall back to an empty list when the
/// store fails (the fallback is cached briefly, so the next real fetch happens
/// soon); single-record reads propagate the error. Writes go straight to the
/// store and then drop the affected cache entries, even when the store reports
/// an error after it was reached.
///
/// A read that is still fetching when a write invalidates its key returns what
/// it fetched but does not cache it.
pub struct ContentService {
    store: Arc<dyn ContentStore>,
    limiter: Arc<ConnectionLimiter>,
    caches: ContentCaches,
}

impl ContentService {
    /// Creates a service over `store`.
    pub fn new(
        store: Arc<dyn ContentStore>,
        limiter: Arc<ConnectionLimiter>,
        cache_config: &CacheConfig,
    ) -> Self {
        Self {
            store,
            limiter,
            caches: ContentCaches::new(cache_config),
        }
    }

    /// Returns the shared limiter.
    pub fn limiter(&self) -> &Arc<ConnectionLimiter> {
        &self.limiter
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PROJECTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Every project, including drafts (admin listing).
    pub async fn projects(&self) -> Result<Vec<Project>> {
        self.project_list(keys::all_projects(), |_| true).await
    }

    /// Projects visible on the public site.
    pub async fn published_projects(&self) -> Result<Vec<Project>> {
        self.project_list(keys::published_projects(), |p| p.published).await
    }

    /// Published projects flagged for the home page.
    pub async fn featured_projects(&self) -> Result<Vec<Project>> {
        self.project_list(keys::featured_projects(), Project::is_featured).await
    }

    /// Published projects filed under `category`.
    pub async fn projects_in_category(&self, category: &str) -> Result<Vec<Project>> {
        validate_slug(category)?;
        self.project_list(keys::projects_in_category(category), |p| {
            p.published && p.category.as_deref() == Some(category)
        })
        .await
    }

    /// Looks up one project. Store errors propagate.
    pub async fn project(&self, slug: &str) -> Result<Option<Project>> {
        self.caches
            .projects
            .cached_fetch(
                &keys::project(slug),
                move || self.limiter.run(move || self.store.get_project(slug)),
                None,
                None,
            )
            .await
    }

    /// Creates or updates a project.
    #[instrument(skip(self, project), fields(slug = %project.slug))]
    pub async fn save_project(&self, project: Project) -> Result<Project> {
        let saved = self
            .write(|| self.store.save_project(project), Self::invalidate_projects)
            .await?;
        info!(id = saved.id, "Project saved");
        Ok(saved)
    }

    /// Deletes a project. Returns false if it did not exist.
    #[instrument(skip(self))]
    pub async fn delete_project(&self, slug: &str) -> Result<bool> {
        let removed = self
            .write(|| self.store.delete_project(slug), Self::invalidate_projects)
            .await?;
        if removed {
            info!("Project deleted");
        }
        Ok(removed)
    }

    async fn project_list<F>(&self, key: String, keep: F) -> Result<Vec<Project>>
    where
        F: Fn(&Project) -> bool,
    {
        self.caches
            .project_lists
            .cached_fetch(
                &key,
                move || async move {
                    let projects = self.limiter.run(move || self.store.list_projects()).await?;
                    Ok::<_, FolioError>(projects.into_iter().filter(|p| keep(p)).collect())
                },
                Some(Vec::new()),
                None,
            )
            .await
    }

    fn invalidate_projects(&self) {
        keys::invalidate_prefix(&self.caches.project_lists, keys::PROJECT_LISTS);
        keys::invalidate_prefix(&self.caches.projects, keys::PROJECT_ITEMS);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CATEGORIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Every category.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.caches
            .categories
            .cached_fetch(
                &keys::all_categories(),
                move || self.limiter.run(move || self.store.list_categories()),
                Some(Vec::new()),
                None,
            )
            .await
    }

    /// Creates or updates a category.
    #[instrument(skip(self, category), fields(slug = %category.slug))]
    pub async fn save_category(&self, category: Category) -> Result<Category> {
        let saved = self
            .write(|| self.store.save_category(category), Self::invalidate_categories)
            .await?;
        info!(id = saved.id, "Category saved");
        Ok(saved)
    }

    /// Deletes a category. Fails while projects are filed under it.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, slug: &str) -> Result<bool> {
        let removed = self
            .write(|| self.store.delete_category(slug), Self::invalidate_categories)
            .await?;
        if removed {
            info!("Category deleted");
        }
        Ok(removed)
    }

    fn invalidate_categories(&self) {
        keys::invalidate_prefix(&self.caches.categories, keys::CATEGORY_LISTS);
        // Category listings of projects are keyed by category slug
        keys::invalidate_prefix(&self.caches.project_lists, keys::PROJECT_LISTS);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PAGES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Every page.
    pub async fn pages(&self) -> Result<Vec<Page>> {
        self.caches
            .pages
            .cached_fetch(
                &keys::all_pages(),
                move || self.limiter.run(move || self.store.list_pages()),
                Some(Vec::new()),
                None,
            )
            .await
    }

    /// Looks up one page. Store errors propagate.
    pub async fn page(&self, slug: &str) -> Result<Option<Page>> {
        self.caches
            .page
            .cached_fetch(
                &keys::page(slug),
                move || self.limiter.run(move || self.store.get_page(slug)),
                None,
                None,
            )
            .await
    }

    /// Creates or updates a page.
    #[instrument(skip(self, page), fields(slug = %page.slug))]
    pub async fn save_page(&self, page: Page) -> Result<Page> {
        let saved = self
            .write(|| self.store.save_page(page), Self::invalidate_pages)
            .await?;
        info!(id = saved.id, "Page saved");
        Ok(saved)
    }

    /// Deletes a page. Returns false if it did not exist.
    #[instrument(skip(self))]
    pub async fn delete_page(&self, slug: &str) -> Result<bool> {
        let removed = self
            .write(|| self.store.delete_page(slug), Self::invalidate_pages)
            .await?;
        if removed {
            info!("Page deleted");
        }
        Ok(removed)
    }

    fn invalidate_pages(&self) {
        keys::invalidate_prefix(&self.caches.pages, keys::PAGE_LISTS);
        keys::invalidate_prefix(&self.caches.page, keys::PAGE_ITEMS);
    }

    /// Runs a store write while holding a slot, then applies `invalidate`.
    ///
    /// Once the store is reached the cache is invalidated on every outcome: a
    /// store may apply a change and still fail, e.g. when a snapshot save fails.
    /// A write that never got a slot invalidates nothing.
    async fn write<T, F, Fut>(&self, write: F, invalidate: fn(&Self)) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let slot = self.limiter.slot().await?;
        let result = write().await;
        invalidate(self);
        drop(slot);
        result
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ADMIN
    // ═══════════════════════════════════════════════════════════════════════════

    /// Content counts, read fresh from the store.
    pub async fn content_stats(&self) -> Result<ContentStats> {
        self.limiter.run(|| self.store.stats()).await
    }

    /// Drops every cached entry.
    pub fn invalidate_all(&self) {
        self.caches.project_lists.clear();
        self.caches.projects.clear();
        self.caches.categories.clear();
        self.caches.pages.clear();
        self.caches.page.clear();
        info!("All content caches cleared");
    }

    /// Sweeps expired entries from every cache.
    pub fn cleanup_expired(&self) {
        self.caches.project_lists.cleanup_expired();
        self.caches.projects.cleanup_expired();
        self.caches.categories.cleanup_expired();
        self.caches.pages.cleanup_expired();
        self.caches.page.cleanup_expired();
    }

    /// Limiter and cache snapshot.
    pub fn status(&self) -> ServiceStatus {
        let mut caches = BTreeMap::new();
        caches.insert("project_lists", self.caches.project_lists.stats());
        caches.insert("projects", self.caches.projects.stats());
        caches.insert("categories", self.caches.categories.stats());
        caches.insert("pages", self.caches.pages.stats());
        caches.insert("page", self.caches.page.stats());

        ServiceStatus {
            limiter: self.limiter.status(),
            caches,
        }
    }
}
