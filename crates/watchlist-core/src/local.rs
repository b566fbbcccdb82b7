use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use watchlist_models::{WatchlistEntry, WatchlistStatus};
use crate::storage::KeyValueStorage;

/// Why a load produced no entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    Missing,
    Unreadable,
    Malformed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocalLoad {
    Loaded(Vec<WatchlistEntry>),
    Empty(EmptyReason),
}

impl LocalLoad {
    pub fn into_entries(self) -> Vec<WatchlistEntry> {
        match self {
            LocalLoad::Loaded(entries) => entries,
            LocalLoad::Empty(_) => Vec::new(),
        }
    }
}

/// Device-scoped watchlist used while no account is signed in.
///
/// The whole collection lives under one storage key as a JSON array. Reads
/// never fail: a missing, unreadable or malformed value is an empty list.
/// Write failures are logged and swallowed.
#[derive(Clone)]
pub struct LocalStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    write_lock: Arc<Mutex<()>>,
}

impl LocalStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn load(&self) -> LocalLoad {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return LocalLoad::Empty(EmptyReason::Missing),
            Err(e) => {
                warn!(key = %self.key, "Failed to read local watchlist: {:#}", e);
                return LocalLoad::Empty(EmptyReason::Unreadable);
            }
        };

        let entries: Vec<WatchlistEntry> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(key = %self.key, "Local watchlist is malformed, treating as empty: {}", e);
                return LocalLoad::Empty(EmptyReason::Malformed);
            }
        };

        LocalLoad::Loaded(collapse_duplicates(entries))
    }

    pub fn read_all(&self) -> Vec<WatchlistEntry> {
        self.load().into_entries()
    }

    pub fn read_status(&self, anime_id: i64) -> Option<WatchlistStatus> {
        self.read_all()
            .into_iter()
            .find(|entry| entry.anime_id == anime_id)
            .map(|entry| entry.status)
    }

    pub fn contains(&self, anime_id: i64) -> bool {
        self.read_status(anime_id).is_some()
    }

    pub fn entries_with_status(&self, status: WatchlistStatus) -> Vec<WatchlistEntry> {
        self.read_all()
            .into_iter()
            .filter(|entry| entry.status == status)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.read_all().len()
    }

    pub fn upsert(&self, anime_id: i64, status: WatchlistStatus) -> WatchlistEntry {
        self.upsert_at(anime_id, status, Utc::now())
    }

    /// Update in place or append; `added_at` is kept for existing entries
    pub fn upsert_at(&self, anime_id: i64, status: WatchlistStatus, now: DateTime<Utc>) -> WatchlistEntry {
        let _guard = self.lock();
        let loaded = self.load();
        let keep_stored = loaded == LocalLoad::Empty(EmptyReason::Unreadable);
        let mut entries = loaded.into_entries();

        let entry = match entries.iter_mut().find(|entry| entry.anime_id == anime_id) {
            Some(existing) => {
                existing.set_status(status, now);
                existing.clone()
            }
            None => {
                let created = WatchlistEntry::new(anime_id, status, now);
                entries.push(created.clone());
                created
            }
        };

        // An unreadable value may still be intact on disk
        if keep_stored {
            warn!(key = %self.key, anime_id, "Local watchlist unreadable, write skipped");
            return entry;
        }
        self.persist(&entries);
        debug!(anime_id, status = %status, "Stored local watchlist entry");
        entry
    }

    /// Returns whether an entry was removed; absent ids are a no-op
    pub fn remove(&self, anime_id: i64) -> bool {
        let _guard = self.lock();
        let mut entries = self.read_all();
        let before = entries.len();
        entries.retain(|entry| entry.anime_id != anime_id);

        if entries.len() == before {
            return false;
        }
        self.persist(&entries);
        debug!(anime_id, "Removed local watchlist entry");
        true
    }

    pub fn clear(&self) {
        let _guard = self.lock();
        if let Err(e) = self.storage.remove(&self.key) {
            warn!(key = %self.key, "Failed to clear local watchlist: {:#}", e);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, entries: &[WatchlistEntry]) {
        let serialized = match serde_json::to_string(entries) {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!(key = %self.key, "Failed to serialize local watchlist: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.set(&self.key, &serialized) {
            warn!(key = %self.key, "Failed to persist local watchlist: {:#}", e);
        }
    }
}

/// Keep one entry per anime id, the most recently updated one, in first-seen order
fn collapse_duplicates(entries: Vec<WatchlistEntry>) -> Vec<WatchlistEntry> {
    let mut positions: HashMap<i64, usize> = HashMap::with_capacity(entries.len());
    let mut unique: Vec<WatchlistEntry> = Vec::with_capacity(entries.len());

    for entry in entries {
        match positions.get(&entry.anime_id) {
            Some(&index) => {
                if entry.updated_at > unique[index].updated_at {
                    unique[index] = entry;
                }
            }
            None => {
                positions.insert(entry.anime_id, unique.len());
                unique.push(entry);
            }
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    const KEY: &str = "team4s_watchlist";

    /// Memory storage whose reads can be switched to fail
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        fail_reads: AtomicBool,
    }

    impl KeyValueStorage for FlakyStorage {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                anyhow::bail!("stream did not contain valid UTF-8");
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> anyhow::Result<()> {
            self.inner.remove(key)
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    fn memory_store() -> (Arc<MemoryStorage>, LocalStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = LocalStore::new(storage.clone(), KEY);
        (storage, store)
    }

    #[test]
    fn test_repeated_upserts_keep_one_entry() {
        let (_, store) = memory_store();
        store.upsert_at(7, WatchlistStatus::Watching, at(1));
        store.upsert_at(7, WatchlistStatus::Break, at(2));
        store.upsert_at(7, WatchlistStatus::Done, at(3));

        let entries = store.read_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, WatchlistStatus::Done);
        assert_eq!(entries[0].added_at, at(1));
        assert_eq!(entries[0].updated_at, at(3));
        assert_eq!(store.read_status(7), Some(WatchlistStatus::Done));
    }

    #[test]
    fn test_remove_twice_is_noop() {
        let (_, store) = memory_store();
        store.upsert_at(1, WatchlistStatus::Planned, at(1));
        store.upsert_at(2, WatchlistStatus::Dropped, at(1));

        assert!(store.remove(1));
        let after_first = store.read_all();
        assert!(!store.remove(1));
        assert_eq!(store.read_all(), after_first);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_missing_value_is_empty() {
        let (_, store) = memory_store();
        assert_eq!(store.load(), LocalLoad::Empty(EmptyReason::Missing));
        assert!(store.read_all().is_empty());
        assert_eq!(store.read_status(1), None);
    }

    #[test]
    fn test_malformed_value_is_empty() {
        let (storage, store) = memory_store();
        storage.set(KEY, "{not json").unwrap();
        assert_eq!(store.load(), LocalLoad::Empty(EmptyReason::Malformed));

        storage
            .set(KEY, r#"[{"animeId":1,"status":"binging","addedAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}]"#)
            .unwrap();
        assert_eq!(store.load(), LocalLoad::Empty(EmptyReason::Malformed));

        // A write after corruption starts a fresh collection
        store.upsert_at(3, WatchlistStatus::Planned, at(1));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_unreadable_value_is_not_overwritten() {
        let storage = Arc::new(FlakyStorage::default());
        let store = LocalStore::new(storage.clone(), KEY);
        store.upsert_at(1, WatchlistStatus::Done, at(1));
        store.upsert_at(2, WatchlistStatus::Watching, at(1));
        let before = storage.inner.get(KEY).unwrap();

        storage.fail_reads.store(true, Ordering::SeqCst);
        assert_eq!(store.load(), LocalLoad::Empty(EmptyReason::Unreadable));
        store.upsert_at(3, WatchlistStatus::Planned, at(2));
        assert!(!store.remove(1));
        assert_eq!(storage.inner.get(KEY).unwrap(), before);

        storage.fail_reads.store(false, Ordering::SeqCst);
        assert_eq!(store.count(), 2);
        assert_eq!(store.read_status(1), Some(WatchlistStatus::Done));
    }

    #[test]
    fn test_duplicates_collapse_to_latest() {
        let (storage, store) = memory_store();
        storage
            .set(
                KEY,
                r#"[
                    {"animeId":5,"status":"planned","addedAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"},
                    {"animeId":6,"status":"done","addedAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"},
                    {"animeId":5,"status":"watching","addedAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-03T00:00:00Z"},
                    {"animeId":5,"status":"dropped","addedAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-02T00:00:00Z"}
                ]"#,
            )
            .unwrap();

        let entries = store.read_all();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].anime_id, 5);
        assert_eq!(entries[0].status, WatchlistStatus::Watching);
        assert_eq!(entries[1].anime_id, 6);
    }

    #[test]
    fn test_stored_layout_uses_camel_case() {
        let (storage, store) = memory_store();
        store.upsert_at(42, WatchlistStatus::Planned, at(0));

        let raw = storage.get(KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["animeId"], 42);
        assert_eq!(value[0]["status"], "planned");
        assert!(value[0].get("addedAt").is_some());
        assert!(value[0].get("updatedAt").is_some());
    }

    #[test]
    fn test_filters_and_clear() {
        let (_, store) = memory_store();
        store.upsert_at(1, WatchlistStatus::Done, at(1));
        store.upsert_at(2, WatchlistStatus::Done, at(1));
        store.upsert_at(3, WatchlistStatus::Watching, at(1));

        assert!(store.contains(3));
        assert!(!store.contains(4));
        assert_eq!(store.entries_with_status(WatchlistStatus::Done).len(), 2);

        store.clear();
        assert_eq!(store.load(), LocalLoad::Empty(EmptyReason::Missing));
    }

    #[test]
    fn test_file_backed_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap());
        LocalStore::new(storage.clone(), KEY).upsert_at(9, WatchlistStatus::Break, at(4));

        let reopened = LocalStore::new(storage, KEY);
        assert_eq!(reopened.read_status(9), Some(WatchlistStatus::Break));
    }
}
