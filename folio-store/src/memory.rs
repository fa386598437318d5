//! In-memory content store.
//!
//! Fast, thread-safe storage suitable for development, testing,
//! and as the working set of [`FileStore`](crate::FileStore).

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use folio_core::constants::SNAPSHOT_VERSION;
use folio_core::error::{FolioError, Result};
use folio_core::traits::ContentStore;
use folio_core::types::{now_timestamp, Category, ContentStats, Page, Project};

/// Full copy of the store's content, used for persistence and backup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    /// Format version
    pub version: u32,
    /// All projects
    #[serde(default)]
    pub projects: Vec<Project>,
    /// All categories
    #[serde(default)]
    pub categories: Vec<Category>,
    /// All pages
    #[serde(default)]
    pub pages: Vec<Page>,
}

/// Shared upsert logic for slug-addressed records.
trait Record: Clone {
    const KIND: &'static str;

    fn id(&self) -> u64;
    fn slug(&self) -> &str;
    fn validate(&self) -> Result<()>;
    /// Stamps id and timestamps before the record is stored.
    fn prepare(&mut self, id: u64, previous: Option<&Self>, now: u64);
}

impl Record for Project {
    const KIND: &'static str = "project";

    fn id(&self) -> u64 {
        self.id
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn validate(&self) -> Result<()> {
        Project::validate(self)
    }

    fn prepare(&mut self, id: u64, previous: Option<&Self>, now: u64) {
        self.id = id;
        self.created_at = previous.map(|p| p.created_at).unwrap_or(now);
        self.updated_at = now;
    }
}

impl Record for Category {
    const KIND: &'static str = "category";

    fn id(&self) -> u64 {
        self.id
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn validate(&self) -> Result<()> {
        Category::validate(self)
    }

    fn prepare(&mut self, id: u64, _previous: Option<&Self>, _now: u64) {
        self.id = id;
    }
}

impl Record for Page {
    const KIND: &'static str = "page";

    fn id(&self) -> u64 {
        self.id
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn validate(&self) -> Result<()> {
        Page::validate(self)
    }

    fn prepare(&mut self, id: u64, _previous: Option<&Self>, now: u64) {
        self.id = id;
        self.updated_at = now;
    }
}

/// Rejects the one id the counter can never move past.
fn check_id<R: Record>(id: u64) -> Result<()> {
    if id == u64::MAX {
        return Err(FolioError::ValidationError(format!(
            "{} id {} is out of range",
            R::KIND,
            id
        )));
    }
    Ok(())
}

/// One collection of records keyed by slug.
#[derive(Debug)]
struct Table<R> {
    rows: DashMap<String, R>,
    next_id: AtomicU64,
}

impl<R: Record> Table<R> {
    fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn get(&self, slug: &str) -> Option<R> {
        self.rows.get(slug).map(|row| row.clone())
    }

    fn all(&self) -> Vec<R> {
        self.rows.iter().map(|row| row.value().clone()).collect()
    }

    fn find_by_id(&self, id: u64) -> Option<R> {
        self.rows
            .iter()
            .find(|row| row.value().id() == id)
            .map(|row| row.value().clone())
    }

    /// Callers must hold the store's write lock.
    fn upsert(&self, mut record: R) -> Result<R> {
        record.validate()?;
        check_id::<R>(record.id())?;

        let previous = if record.id() == 0 {
            None
        } else {
            self.find_by_id(record.id())
        };

        if let Some(owner) = self.rows.get(record.slug()) {
            if owner.id() != record.id() {
                return Err(FolioError::DuplicateSlug {
                    kind: R::KIND,
                    slug: record.slug().to_string(),
                    owner: owner.id(),
                });
            }
        }

        let id = match record.id() {
            0 => self
                .next_id
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
                    (next < u64::MAX).then(|| next + 1)
                })
                .map_err(|_| FolioError::ValidationError(format!("{} ids exhausted", R::KIND)))?,
            id => {
                self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
                id
            }
        };

        // A renamed record leaves its old slug behind
        if let Some(prev) = &previous {
            if prev.slug() != record.slug() {
                self.rows.remove(prev.slug());
            }
        }

        record.prepare(id, previous.as_ref(), now_timestamp());
        self.rows.insert(record.slug().to_string(), record.clone());
        debug!(kind = R::KIND, id, slug = record.slug(), "Saved record");
        Ok(record)
    }

    fn remove(&self, slug: &str) -> bool {
        self.rows.remove(slug).is_some()
    }

    /// Inserts rows as-is, keeping their ids.
    fn import(&self, rows: Vec<R>) -> Result<usize> {
        let mut imported = 0;
        for row in rows {
            row.validate()?;
            check_id::<R>(row.id())?;
            self.next_id.fetch_max(row.id().saturating_add(1), Ordering::SeqCst);
            self.rows.insert(row.slug().to_string(), row);
            imported += 1;
        }
        Ok(imported)
    }

    fn clear(&self) {
        self.rows.clear();
        self.next_id.store(1, Ordering::SeqCst);
    }
}

/// In-memory content store.
///
/// Reads are lock-free through `DashMap`; writes are serialized so slug
/// uniqueness and category references are checked atomically.
#[derive(Debug)]
pub struct MemoryStore {
    projects: Table<Project>,
    categories: Table<Category>,
    pages: Table<Page>,
    write_lock: Mutex<()>,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            projects: Table::new(),
            categories: Table::new(),
            pages: Table::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns a full copy of the content.
    pub fn snapshot(&self) -> ContentSnapshot {
        ContentSnapshot {
            version: SNAPSHOT_VERSION,
            projects: sorted_projects(self.projects.all()),
            categories: sorted_categories(self.categories.all()),
            pages: sorted_pages(self.pages.all()),
        }
    }

    /// Loads a snapshot on top of the current content, keeping record ids.
    ///
    /// Returns the number of records imported.
    pub fn import(&self, snapshot: ContentSnapshot) -> Result<usize> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(FolioError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                actual: snapshot.version,
            });
        }

        let _guard = self.write_lock.lock();
        let mut imported = self.categories.import(snapshot.categories)?;
        imported += self.projects.import(snapshot.projects)?;
        imported += self.pages.import(snapshot.pages)?;
        Ok(imported)
    }

    /// Removes all content.
    pub fn clear(&self) {
        let _guard = self.write_lock.lock();
        self.projects.clear();
        self.categories.clear();
        self.pages.clear();
    }

    /// Returns the total number of records.
    pub fn len(&self) -> usize {
        self.projects.rows.len() + self.categories.rows.len() + self.pages.rows.len()
    }

    /// Returns true if the store holds no content.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn compute_stats(&self) -> ContentStats {
        let mut stats = ContentStats {
            categories: self.categories.rows.len() as u64,
            pages: self.pages.rows.len() as u64,
            ..ContentStats::default()
        };
        for row in self.projects.rows.iter() {
            let project = row.value();
            stats.projects += 1;
            if project.published {
                stats.published_projects += 1;
            }
            if project.is_featured() {
                stats.featured_projects += 1;
            }
        }
        stats
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_projects(mut projects: Vec<Project>) -> Vec<Project> {
    projects.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.slug.cmp(&b.slug)));
    projects
}

fn sorted_categories(mut categories: Vec<Category>) -> Vec<Category> {
    categories.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.slug.cmp(&b.slug)));
    categories
}

fn sorted_pages(mut pages: Vec<Page>) -> Vec<Page> {
    pages.sort_by(|a, b| a.slug.cmp(&b.slug));
    pages
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(sorted_projects(self.projects.all()))
    }

    #[instrument(skip(self))]
    async fn get_project(&self, slug: &str) -> Result<Option<Project>> {
        Ok(self.projects.get(slug))
    }

    /// Saves a project.
    ///
    /// The referenced category, if any, must exist.
    #[instrument(skip(self, project), fields(slug = %project.slug))]
    async fn save_project(&self, project: Project) -> Result<Project> {
        let _guard = self.write_lock.lock();
        if let Some(category) = &project.category {
            if self.categories.get(category).is_none() {
                return Err(FolioError::ValidationError(format!(
                    "unknown category '{}'",
                    category
                )));
            }
        }
        self.projects.upsert(project)
    }

    #[instrument(skip(self))]
    async fn delete_project(&self, slug: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();
        Ok(self.projects.remove(slug))
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(sorted_categories(self.categories.all()))
    }

    #[instrument(skip(self, category), fields(slug = %category.slug))]
    async fn save_category(&self, category: Category) -> Result<Category> {
        let _guard = self.write_lock.lock();

        // Renaming a category that still has projects would orphan them
        if category.id != 0 {
            if let Some(previous) = self.categories.find_by_id(category.id) {
                if previous.slug != category.slug && self.projects_in(&previous.slug) > 0 {
                    return Err(FolioError::ValidationError(format!(
                        "category '{}' still has projects",
                        previous.slug
                    )));
                }
            }
        }
        self.categories.upsert(category)
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, slug: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let in_use = self.projects_in(slug);
        if in_use > 0 {
            return Err(FolioError::ValidationError(format!(
                "category '{}' still has {} project(s)",
                slug, in_use
            )));
        }
        Ok(self.categories.remove(slug))
    }

    async fn list_pages(&self) -> Result<Vec<Page>> {
        Ok(sorted_pages(self.pages.all()))
    }

    #[instrument(skip(self))]
    async fn get_page(&self, slug: &str) -> Result<Option<Page>> {
        Ok(self.pages.get(slug))
    }

    #[instrument(skip(self, page), fields(slug = %page.slug))]
    async fn save_page(&self, page: Page) -> Result<Page> {
        let _guard = self.write_lock.lock();
        self.pages.upsert(page)
    }

    #[instrument(skip(self))]
    async fn delete_page(&self, slug: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();
        Ok(self.pages.remove(slug))
    }

    async fn stats(&self) -> Result<ContentStats> {
        Ok(self.compute_stats())
    }
}

impl MemoryStore {
    fn projects_in(&self, category: &str) -> usize {
        self.projects
            .rows
            .iter()
            .filter(|row| row.value().category.as_deref() == Some(category))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_category() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .save_category(Category::new("residential", "Residential"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_save_and_get_project() {
        let store = store_with_category().await;

        let saved = store
            .save_project(Project::new("casa-verde", "Casa Verde").in_category("residential"))
            .await
            .unwrap();
        assert_eq!(saved.id, 1);
        assert!(saved.created_at > 0);
        assert_eq!(saved.created_at, saved.updated_at);

        let fetched = store.get_project("casa-verde").await.unwrap().unwrap();
        assert_eq!(fetched, saved);
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = MemoryStore::new();

        let a = store.save_project(Project::new("a", "A")).await.unwrap();
        let b = store.save_project(Project::new("b", "B")).await.unwrap();
        let c = store.save_project(Project::new("c", "C")).await.unwrap();

        assert_eq!((a.id, b.id, c.id), (1, 2, 3));
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_created_at() {
        let store = MemoryStore::new();
        let mut saved = store.save_project(Project::new("loft", "Loft")).await.unwrap();
        let created_at = saved.created_at;

        saved.title = "Loft Conversion".into();
        let updated = store.save_project(saved).await.unwrap();

        assert_eq!(updated.id, 1);
        assert_eq!(updated.created_at, created_at);
        assert_eq!(store.list_projects().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_moves_slug() {
        let store = MemoryStore::new();
        let mut saved = store.save_project(Project::new("loft", "Loft")).await.unwrap();

        saved.slug = "city-loft".into();
        store.save_project(saved).await.unwrap();

        assert!(store.get_project("loft").await.unwrap().is_none());
        assert!(store.get_project("city-loft").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let store = MemoryStore::new();
        store.save_project(Project::new("loft", "Loft")).await.unwrap();

        let err = store
            .save_project(Project::new("loft", "Another Loft"))
            .await
            .unwrap_err();

        assert!(matches!(err, FolioError::DuplicateSlug { owner: 1, .. }));
    }

    #[tokio::test]
    async fn test_unknown_category_rejected() {
        let store = MemoryStore::new();
        let result = store
            .save_project(Project::new("loft", "Loft").in_category("missing"))
            .await;
        assert!(matches!(result, Err(FolioError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_invalid_project_rejected() {
        let store = MemoryStore::new();
        let result = store.save_project(Project::new("Bad Slug", "Loft")).await;
        assert!(matches!(result, Err(FolioError::InvalidSlug(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_list_sorted_by_position_then_slug() {
        let store = MemoryStore::new();
        let mut first = Project::new("zeta", "Zeta");
        first.position = 0;
        let mut second = Project::new("alpha", "Alpha");
        second.position = 1;
        let mut third = Project::new("beta", "Beta");
        third.position = 1;

        for p in [third, second, first] {
            store.save_project(p).await.unwrap();
        }

        let slugs: Vec<_> = store
            .list_projects()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(slugs, vec!["zeta", "alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_delete_category_in_use() {
        let store = store_with_category().await;
        store
            .save_project(Project::new("casa-verde", "Casa Verde").in_category("residential"))
            .await
            .unwrap();

        assert!(store.delete_category("residential").await.is_err());

        store.delete_project("casa-verde").await.unwrap();
        assert!(store.delete_category("residential").await.unwrap());
        assert!(!store.delete_category("residential").await.unwrap());
    }

    #[tokio::test]
    async fn test_pages() {
        let store = MemoryStore::new();
        let page = store
            .save_page(Page::new("about", "About", "We design buildings."))
            .await
            .unwrap();
        assert!(page.updated_at > 0);

        assert_eq!(store.get_page("about").await.unwrap().unwrap().title, "About");
        assert!(store.delete_page("about").await.unwrap());
        assert!(store.get_page("about").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stats() {
        let store = store_with_category().await;
        store
            .save_project(Project::new("a", "A").published().featured())
            .await
            .unwrap();
        store.save_project(Project::new("b", "B").published()).await.unwrap();
        store.save_project(Project::new("c", "C").featured()).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(
            stats,
            ContentStats {
                projects: 3,
                published_projects: 2,
                featured_projects: 1,
                categories: 1,
                pages: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_snapshot_import() {
        let store = store_with_category().await;
        store
            .save_project(Project::new("a", "A").in_category("residential"))
            .await
            .unwrap();
        store.save_page(Page::new("about", "About", "")).await.unwrap();

        let snapshot = store.snapshot();

        let restored = MemoryStore::new();
        assert_eq!(restored.import(snapshot.clone()).unwrap(), 3);
        assert_eq!(restored.snapshot(), snapshot);

        // New records continue after imported ids
        let next = restored.save_project(Project::new("b", "B")).await.unwrap();
        assert_eq!(next.id, 2);
    }

    #[tokio::test]
    async fn test_import_rejects_unknown_version() {
        let store = MemoryStore::new();
        let snapshot = ContentSnapshot {
            version: 99,
            ..ContentSnapshot::default()
        };
        assert!(matches!(
            store.import(snapshot),
            Err(FolioError::VersionMismatch { actual: 99, .. })
        ));
    }

    #[tokio::test]
    async fn test_max_id_rejected() {
        let store = MemoryStore::new();
        let mut project = Project::new("edge", "Edge");
        project.id = u64::MAX;

        assert!(matches!(
            store.save_project(project.clone()).await,
            Err(FolioError::ValidationError(_))
        ));

        let snapshot = ContentSnapshot {
            version: SNAPSHOT_VERSION,
            projects: vec![project],
            ..ContentSnapshot::default()
        };
        assert!(matches!(
            store.import(snapshot),
            Err(FolioError::ValidationError(_))
        ));

        // Counter is untouched
        let next = store.save_project(Project::new("a", "A")).await.unwrap();
        assert_eq!(next.id, 1);
    }

    #[tokio::test]
    async fn test_large_explicit_id_advances_counter() {
        let store = MemoryStore::new();
        let mut project = Project::new("edge", "Edge");
        project.id = u64::MAX - 2;
        store.save_project(project).await.unwrap();

        let next = store.save_project(Project::new("a", "A")).await.unwrap();
        assert_eq!(next.id, u64::MAX - 1);

        assert!(matches!(
            store.save_project(Project::new("b", "B")).await,
            Err(FolioError::ValidationError(msg)) if msg.contains("exhausted")
        ));
    }

    #[tokio::test]
    async fn test_concurrent_saves() {
        use std::sync::Arc;
        use tokio::task::JoinSet;

        let store = Arc::new(MemoryStore::new());
        let mut tasks = JoinSet::new();

        for i in 0..50 {
            let store = store.clone();
            tasks.spawn(async move {
                store
                    .save_project(Project::new(format!("project-{}", i), "Project"))
                    .await
                    .unwrap()
            });
        }

        let mut ids = Vec::new();
        while let Some(result) = tasks.join_next().await {
            ids.push(result.unwrap().id);
        }
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(ids.len(), 50);
        assert_eq!(store.list_projects().await.unwrap().len(), 50);
    }
}
