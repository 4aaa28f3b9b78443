use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::cache::ResultCache;
use crate::config::EngineConfig;
use crate::error::{Result, SearchError};
use crate::filters::{ActiveFilter, FilterField, FilterSet, FilterValue, SortField, SortOrder, SortSpec};
use crate::history::{RecentSearch, SavedSearch, SearchHistory};
use crate::persist::{load_json, save_json, SearchStatePersistence};
use crate::query::page::Page;
use crate::query::{page, predicate, ranker};
use crate::source::{fetch_with_timeout, JobSource, QueryHints};

pub const CURRENT_STATE_KEY: &str = "current_state";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CurrentState {
    filters: FilterSet,
    sort: SortSpec,
}

/// One search session's query state and its orchestration.
///
/// Constructed per session; no process-wide singletons. The result
/// cache and data source are shared across sessions (entries are keyed
/// purely by query content), while filters, sort, page and history
/// belong to this session alone.
pub struct QueryEngine {
    filters: FilterSet,
    sort: SortSpec,
    page: u32,
    dirty: bool,
    last_total_results: Option<u64>,
    history: SearchHistory,
    cache: Arc<ResultCache>,
    source: Arc<dyn JobSource>,
    store: Arc<dyn SearchStatePersistence>,
    config: EngineConfig,
}

impl QueryEngine {
    /// Restores current state and history from persistence; corrupted
    /// or missing records yield defaults.
    pub fn new(
        cache: Arc<ResultCache>,
        source: Arc<dyn JobSource>,
        store: Arc<dyn SearchStatePersistence>,
        config: EngineConfig,
    ) -> Self {
        let state: CurrentState = load_json(store.as_ref(), CURRENT_STATE_KEY);
        let history = SearchHistory::restore(
            store.as_ref(),
            config.max_saved_searches,
            config.max_recent_searches,
        );

        Self {
            filters: state.filters,
            sort: state.sort,
            page: 1,
            dirty: true,
            last_total_results: None,
            history,
            cache,
            source,
            store,
            config,
        }
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// True when a mutation happened since the last `execute()`. Gives
    /// callers a debounce hook; nothing inside the engine reads it.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn active_filters(&self) -> Vec<ActiveFilter> {
        self.filters.active_filters()
    }

    pub fn saved_searches(&self) -> Vec<SavedSearch> {
        self.history.saved().cloned().collect()
    }

    pub fn recent_searches(&self) -> Vec<RecentSearch> {
        self.history.recent().cloned().collect()
    }

    pub fn set_filter(&mut self, field: FilterField, value: FilterValue) -> Result<()> {
        self.filters.set(field, value)?;
        self.touch();
        Ok(())
    }

    pub fn toggle_skill(&mut self, skill: &str) -> Result<()> {
        self.filters.toggle_set_member(FilterField::Skills, skill)?;
        self.touch();
        Ok(())
    }

    pub fn remove_filter(&mut self, field: FilterField, member: Option<&str>) -> Result<()> {
        self.filters.remove(field, member)?;
        self.touch();
        Ok(())
    }

    /// Resets the filter set to defaults. Cache entries are not
    /// invalidated; old entries simply age out by TTL since correctness
    /// depends only on the key.
    pub fn clear_all(&mut self) {
        self.filters.clear();
        self.page = 1;
        self.touch();
    }

    pub fn set_sort(&mut self, field: SortField, order: SortOrder) {
        self.sort = SortSpec::new(field, order);
        self.touch();
    }

    pub fn goto_page(&mut self, page_number: u32) {
        self.page = page_number.max(1);
        self.dirty = true;
    }

    /// Runs the query pipeline: cache check, then fetch → filter →
    /// rank → paginate → cache store → recent-search append. A repeat
    /// of an identical query within the TTL window returns the cached
    /// page unchanged. Fetch failures propagate uncached so the next
    /// call retries.
    #[instrument(skip(self), fields(page = self.page))]
    pub async fn execute(&mut self) -> Result<Page> {
        let filter_key = self.filters.serialize_key();
        let key = ResultCache::key(&filter_key, self.sort, self.page);

        if let Some(cached) = self.cache.get(key) {
            debug!(key, "returning cached result page");
            self.page = cached.page_number;
            self.last_total_results = Some(cached.total_results);
            self.dirty = false;
            return Ok(cached);
        }

        let hints = QueryHints::from_filters(&self.filters);
        let candidates =
            fetch_with_timeout(self.source.as_ref(), &hints, self.config.fetch_timeout).await?;

        let mut matched: Vec<_> = candidates
            .into_iter()
            .filter(|listing| predicate::matches(listing, &self.filters))
            .collect();
        ranker::sort_listings(&mut matched, &self.filters, self.sort);

        let result = page::paginate(matched, self.page, self.config.page_size);
        debug!(
            key,
            total_results = result.total_results,
            page = result.page_number,
            "computed result page"
        );

        self.cache.put(key, result.clone());
        self.history
            .record_recent(&self.filters.keywords, &self.filters.location);
        self.history.persist_recent(self.store.as_ref());

        self.page = result.page_number;
        self.last_total_results = Some(result.total_results);
        self.dirty = false;
        Ok(result)
    }

    /// Snapshots the live query under a user-chosen name.
    pub fn save_current_search(&mut self, name: &str) -> Result<SavedSearch> {
        if name.trim().is_empty() {
            return Err(SearchError::Validation("search name must not be blank".into()));
        }

        let entry = self.history.save(
            name.trim(),
            self.filters.clone(),
            self.sort,
            self.last_total_results.unwrap_or(0),
        );
        self.history.persist_saved(self.store.as_ref());
        Ok(entry)
    }

    /// Replaces the live query with a saved snapshot, resets to page 1
    /// and runs a fresh `execute()`. A fetch failure leaves the loaded
    /// state applied; the query is simply retryable.
    pub async fn load_saved_search(&mut self, id: u64) -> Result<Page> {
        let saved = self
            .history
            .get_saved(id)
            .ok_or(SearchError::NotFound(id))?;

        self.filters = saved.filters.clone();
        self.sort = saved.sort;
        self.page = 1;
        self.touch();
        self.execute().await
    }

    pub fn delete_saved_search(&mut self, id: u64) -> Result<()> {
        self.history.delete_saved(id)?;
        self.history.persist_saved(self.store.as_ref());
        Ok(())
    }

    fn touch(&mut self) {
        self.dirty = true;
        // The count belongs to the query just replaced; a save before
        // the next execute() must not carry it over.
        self.last_total_results = None;
        save_json(
            self.store.as_ref(),
            CURRENT_STATE_KEY,
            &CurrentState {
                filters: self.filters.clone(),
                sort: self.sort,
            },
        );
    }
}
