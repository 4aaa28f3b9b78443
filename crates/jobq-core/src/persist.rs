//! Persistence substrate for current state, saved searches and recents.
//!
//! Records are opaque serialized blobs under independent string keys.
//! Corrupted or missing records always fall back to defaults without
//! raising; the engine must stay usable when storage misbehaves.
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait SearchStatePersistence: Send + Sync {
    /// Returns the stored record, or `None` when missing or unreadable.
    fn load(&self, key: &str) -> Option<Vec<u8>>;

    fn save(&self, key: &str, value: &[u8]) -> Result<(), PersistError>;
}

/// Loads and decodes a record, falling back to `T::default()` on any
/// missing or corrupted data.
pub fn load_json<T>(store: &dyn SearchStatePersistence, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(bytes) = store.load(key) else {
        return T::default();
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            warn!(key, error = %err, "discarding corrupted persisted record");
            T::default()
        }
    }
}

/// Encodes and stores a record. Failures are logged, never raised:
/// persistence is best-effort and must not break the live session.
pub fn save_json<T>(store: &dyn SearchStatePersistence, key: &str, value: &T)
where
    T: Serialize,
{
    let result = serde_json::to_vec(value)
        .map_err(PersistError::from)
        .and_then(|bytes| store.save(key, &bytes));

    if let Err(err) = result {
        warn!(key, error = %err, "failed to persist search state");
    }
}

/// JSON files under a root directory, one file per key.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{safe}.json"))
    }
}

impl SearchStatePersistence for FileStore {
    fn load(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read persisted record");
                None
            }
        }
    }

    fn save(&self, key: &str, value: &[u8]) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SearchStatePersistence for MemoryStore {
    fn load(&self, key: &str) -> Option<Vec<u8>> {
        self.records.lock().unwrap().get(key).cloned()
    }

    fn save(&self, key: &str, value: &[u8]) -> Result<(), PersistError> {
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Prefixes every key, giving each session an isolated namespace over a
/// shared backing store.
pub struct ScopedStore {
    inner: Arc<dyn SearchStatePersistence>,
    prefix: String,
}

impl ScopedStore {
    pub fn new(inner: Arc<dyn SearchStatePersistence>, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}__{key}", self.prefix)
    }
}

impl SearchStatePersistence for ScopedStore {
    fn load(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.load(&self.scoped(key))
    }

    fn save(&self, key: &str, value: &[u8]) -> Result<(), PersistError> {
        self.inner.save(&self.scoped(key), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Record {
        count: u32,
    }

    #[test]
    fn file_store_round_trips_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        save_json(&store, "current_state", &Record { count: 7 });
        let restored: Record = load_json(&store, "current_state");

        assert_eq!(restored, Record { count: 7 });
    }

    #[test]
    fn corrupted_records_fall_back_to_defaults() {
        let store = MemoryStore::new();
        store.save("current_state", b"{not json").unwrap();

        let restored: Record = load_json(&store, "current_state");

        assert_eq!(restored, Record::default());
    }

    #[test]
    fn missing_records_fall_back_to_defaults() {
        let store = MemoryStore::new();
        let restored: Record = load_json(&store, "never_written");

        assert_eq!(restored, Record::default());
    }

    #[test]
    fn scoped_stores_do_not_collide() {
        let shared: Arc<dyn SearchStatePersistence> = Arc::new(MemoryStore::new());
        let first = ScopedStore::new(Arc::clone(&shared), "session-a");
        let second = ScopedStore::new(Arc::clone(&shared), "session-b");

        save_json(&first, "history", &Record { count: 1 });
        save_json(&second, "history", &Record { count: 2 });

        assert_eq!(load_json::<Record>(&first, "history"), Record { count: 1 });
        assert_eq!(load_json::<Record>(&second, "history"), Record { count: 2 });
    }

    #[test]
    fn file_store_sanitizes_hostile_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        save_json(&store, "../escape", &Record { count: 3 });

        assert_eq!(load_json::<Record>(&store, "../escape"), Record { count: 3 });
        assert!(!dir.path().parent().unwrap().join("escape.json").exists());
    }
}
