//! Cache key layout and prefix invalidation.
//!
//! List keys share a prefix per resource so a write can drop every list view
//! of that resource at once.

use folio_cache::TtlCache;
use tracing::debug;

/// Prefix of every project list key.
pub const PROJECT_LISTS: &str = "projects:";
/// Prefix of every single-project key.
pub const PROJECT_ITEMS: &str = "project:";
/// Prefix of every category list key.
pub const CATEGORY_LISTS: &str = "categories:";
/// Prefix of every page list key.
pub const PAGE_LISTS: &str = "pages:";
/// Prefix of every single-page key.
pub const PAGE_ITEMS: &str = "page:";

pub fn all_projects() -> String {
    format!("{}all", PROJECT_LISTS)
}

pub fn published_projects() -> String {
    format!("{}published", PROJECT_LISTS)
}

pub fn featured_projects() -> String {
    format!("{}featured", PROJECT_LISTS)
}

pub fn projects_in_category(category: &str) -> String {
    format!("{}category:{}", PROJECT_LISTS, category)
}

pub fn project(slug: &str) -> String {
    format!("{}{}", PROJECT_ITEMS, slug)
}

pub fn all_categories() -> String {
    format!("{}all", CATEGORY_LISTS)
}

pub fn all_pages() -> String {
    format!("{}all", PAGE_LISTS)
}

pub fn page(slug: &str) -> String {
    format!("{}{}", PAGE_ITEMS, slug)
}

/// Deletes every entry whose key starts with `prefix`. Returns how many were removed.
///
/// Fetches in flight are told not to cache, including ones for keys not yet present.
pub fn invalidate_prefix<T: Clone>(cache: &TtlCache<T>, prefix: &str) -> usize {
    cache.invalidate_pending();
    let removed = cache
        .keys()
        .into_iter()
        .filter(|key| key.starts_with(prefix))
        .filter(|key| cache.delete(key))
        .count();
    debug!(prefix, removed, "Invalidated cache prefix");
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_prefix() {
        let cache = TtlCache::new();
        cache.set(&all_projects(), 1);
        cache.set(&projects_in_category("residential"), 2);
        cache.set(&project("casa-verde"), 3);
        cache.set(&all_pages(), 4);

        assert_eq!(invalidate_prefix(&cache, PROJECT_LISTS), 2);

        assert!(!cache.has(&all_projects()));
        assert!(!cache.has(&projects_in_category("residential")));
        // "project:" does not share the "projects:" prefix
        assert!(cache.has(&project("casa-verde")));
        assert!(cache.has(&all_pages()));
    }

    #[test]
    fn test_invalidate_prefix_no_match() {
        let cache: TtlCache<u8> = TtlCache::new();
        cache.set("page:about", 1);
        assert_eq!(invalidate_prefix(&cache, "projects:"), 0);
        assert_eq!(cache.len(), 1);
    }
}
