//! Bounded saved/recent search lists, persisted under independent keys.
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::filters::{FilterSet, SortSpec};
use crate::persist::{load_json, save_json, SearchStatePersistence};

pub const SAVED_SEARCHES_KEY: &str = "saved_searches";
pub const RECENT_SEARCHES_KEY: &str = "recent_searches";

/// User-named snapshot of a full query, explicitly saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub id: u64,
    pub name: String,
    pub filters: FilterSet,
    pub sort: SortSpec,
    pub created_at: DateTime<Utc>,
    pub result_count_at_save: u64,
}

/// Implicit record of a past search. Repeats are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentSearch {
    pub keywords: String,
    pub location: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct SavedSearches {
    next_id: u64,
    entries: VecDeque<SavedSearch>,
}

/// Both history lists plus their capacities. Head-insert; the oldest
/// entry is dropped on overflow. Independent of the result cache.
#[derive(Debug)]
pub struct SearchHistory {
    saved: SavedSearches,
    recent: VecDeque<RecentSearch>,
    max_saved: usize,
    max_recent: usize,
}

impl SearchHistory {
    /// Restores both lists from persistence, trimming to the configured
    /// capacities in case stored records were written under larger ones.
    pub fn restore(
        store: &dyn SearchStatePersistence,
        max_saved: usize,
        max_recent: usize,
    ) -> Self {
        let mut saved: SavedSearches = load_json(store, SAVED_SEARCHES_KEY);
        let mut recent: VecDeque<RecentSearch> = load_json(store, RECENT_SEARCHES_KEY);
        saved.entries.truncate(max_saved);
        recent.truncate(max_recent);

        Self {
            saved,
            recent,
            max_saved,
            max_recent,
        }
    }

    pub fn record_recent(&mut self, keywords: &str, location: &str) {
        self.recent.push_front(RecentSearch {
            keywords: keywords.to_string(),
            location: location.to_string(),
            timestamp: Utc::now(),
        });
        self.recent.truncate(self.max_recent);
    }

    pub fn save(
        &mut self,
        name: &str,
        filters: FilterSet,
        sort: SortSpec,
        result_count_at_save: u64,
    ) -> SavedSearch {
        self.saved.next_id += 1;
        let entry = SavedSearch {
            id: self.saved.next_id,
            name: name.to_string(),
            filters,
            sort,
            created_at: Utc::now(),
            result_count_at_save,
        };

        self.saved.entries.push_front(entry.clone());
        self.saved.entries.truncate(self.max_saved);
        entry
    }

    pub fn get_saved(&self, id: u64) -> Option<&SavedSearch> {
        self.saved.entries.iter().find(|entry| entry.id == id)
    }

    pub fn delete_saved(&mut self, id: u64) -> Result<()> {
        let position = self
            .saved
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(SearchError::NotFound(id))?;

        self.saved.entries.remove(position);
        Ok(())
    }

    pub fn saved(&self) -> impl Iterator<Item = &SavedSearch> {
        self.saved.entries.iter()
    }

    pub fn recent(&self) -> impl Iterator<Item = &RecentSearch> {
        self.recent.iter()
    }

    pub fn persist_saved(&self, store: &dyn SearchStatePersistence) {
        save_json(store, SAVED_SEARCHES_KEY, &self.saved);
    }

    pub fn persist_recent(&self, store: &dyn SearchStatePersistence) {
        save_json(store, RECENT_SEARCHES_KEY, &self.recent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStore;

    fn history() -> SearchHistory {
        let store = MemoryStore::new();
        SearchHistory::restore(&store, 10, 5)
    }

    #[test]
    fn eleventh_saved_search_drops_the_oldest() {
        let mut history = history();

        for index in 1..=11 {
            history.save(
                &format!("search {index}"),
                FilterSet::default(),
                SortSpec::default(),
                0,
            );
        }

        let names: Vec<_> = history.saved().map(|entry| entry.name.clone()).collect();
        assert_eq!(names.len(), 10);
        assert_eq!(names.first().unwrap(), "search 11");
        assert!(!names.contains(&"search 1".to_string()));
    }

    #[test]
    fn sixth_recent_search_drops_the_oldest() {
        let mut history = history();

        for index in 1..=6 {
            history.record_recent(&format!("query {index}"), "");
        }

        let keywords: Vec<_> = history.recent().map(|entry| entry.keywords.clone()).collect();
        assert_eq!(keywords.len(), 5);
        assert_eq!(keywords.first().unwrap(), "query 6");
        assert!(!keywords.contains(&"query 1".to_string()));
    }

    #[test]
    fn recent_searches_allow_repeats() {
        let mut history = history();
        history.record_recent("rust", "austin");
        history.record_recent("rust", "austin");

        assert_eq!(history.recent().count(), 2);
    }

    #[test]
    fn saved_ids_stay_unique_across_overflow() {
        let mut history = history();
        for index in 1..=12 {
            history.save(&format!("s{index}"), FilterSet::default(), SortSpec::default(), 0);
        }

        let latest = history.save("latest", FilterSet::default(), SortSpec::default(), 0);
        assert_eq!(latest.id, 13);
    }

    #[test]
    fn delete_of_unknown_id_reports_not_found() {
        let mut history = history();
        let saved = history.save("keep", FilterSet::default(), SortSpec::default(), 0);

        assert!(matches!(
            history.delete_saved(saved.id + 1),
            Err(SearchError::NotFound(_))
        ));
        assert!(history.get_saved(saved.id).is_some());

        history.delete_saved(saved.id).unwrap();
        assert!(history.get_saved(saved.id).is_none());
    }

    #[test]
    fn lists_survive_a_persistence_round_trip() {
        let store = MemoryStore::new();
        let mut history = SearchHistory::restore(&store, 10, 5);
        history.save("mine", FilterSet::default(), SortSpec::default(), 42);
        history.record_recent("rust", "remote");
        history.persist_saved(&store);
        history.persist_recent(&store);

        let restored = SearchHistory::restore(&store, 10, 5);
        assert_eq!(restored.saved().count(), 1);
        assert_eq!(restored.saved().next().unwrap().result_count_at_save, 42);
        assert_eq!(restored.recent().next().unwrap().keywords, "rust");
    }
}
