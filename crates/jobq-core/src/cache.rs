//! Time-bounded memoization of result pages, shared across sessions.
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::filters::SortSpec;
use crate::query::page::Page;

#[derive(Debug, Clone)]
struct CacheEntry {
    page: Page,
    stored_at: Instant,
}

/// LRU-capped page cache with lazy TTL staleness checks. Entries are
/// never swept in the background: a stale entry is dropped at read time
/// and repopulated by the next miss for the same key.
pub struct ResultCache {
    entries: Mutex<LruCache<u64, CacheEntry>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Composite key over the serialized query. Identical queries hash
    /// identically regardless of how the filter set was built.
    pub fn key(filter_key: &str, sort: SortSpec, page_number: u32) -> u64 {
        let mut hasher = DefaultHasher::new();
        filter_key.hash(&mut hasher);
        sort.serialize_key().hash(&mut hasher);
        page_number.hash(&mut hasher);
        hasher.finish()
    }

    pub fn get(&self, key: u64) -> Option<Page> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(&key) {
            Some(entry) if entry.stored_at.elapsed() <= self.ttl => Some(entry.page.clone()),
            Some(_) => {
                entries.pop(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: u64, page: Page) {
        self.entries.lock().unwrap().put(
            key,
            CacheEntry {
                page,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{FilterSet, SortField, SortOrder};

    fn page(page_number: u32) -> Page {
        Page {
            items: vec![],
            page_number,
            page_size: 20,
            total_results: 0,
            total_pages: 0,
        }
    }

    #[test]
    fn round_trips_within_ttl() {
        let cache = ResultCache::new(8, Duration::from_secs(300));
        let key = ResultCache::key("kw=rust", SortSpec::default(), 1);

        cache.put(key, page(1));

        assert_eq!(cache.get(key), Some(page(1)));
    }

    #[test]
    fn stale_entries_are_ignored_and_dropped() {
        let cache = ResultCache::new(8, Duration::ZERO);
        let key = ResultCache::key("kw=rust", SortSpec::default(), 1);

        cache.put(key, page(1));
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.get(key), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = ResultCache::new(2, Duration::from_secs(300));
        let first = ResultCache::key("kw=a", SortSpec::default(), 1);
        let second = ResultCache::key("kw=b", SortSpec::default(), 1);
        let third = ResultCache::key("kw=c", SortSpec::default(), 1);

        cache.put(first, page(1));
        cache.put(second, page(2));
        cache.put(third, page(3));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(first), None);
        assert_eq!(cache.get(third), Some(page(3)));
    }

    #[test]
    fn key_distinguishes_each_component() {
        let filters = FilterSet::default();
        let base = ResultCache::key(&filters.serialize_key(), SortSpec::default(), 1);

        let other_page = ResultCache::key(&filters.serialize_key(), SortSpec::default(), 2);
        let other_sort = ResultCache::key(
            &filters.serialize_key(),
            SortSpec::new(SortField::Salary, SortOrder::Asc),
            1,
        );

        assert_ne!(base, other_page);
        assert_ne!(base, other_sort);
    }
}
