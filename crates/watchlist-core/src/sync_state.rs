use std::sync::Arc;
use tracing::warn;
use crate::storage::KeyValueStorage;

/// Persisted "already merged in this session" flag.
///
/// Set after a successful merge, cleared on logout. Storage failures read as
/// "not merged", which at worst repeats a merge the server resolves anyway.
#[derive(Clone)]
pub struct SyncState {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl SyncState {
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn is_merged(&self) -> bool {
        match self.storage.get(&self.key) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!(key = %self.key, "Failed to read merge flag: {:#}", e);
                false
            }
        }
    }

    pub fn mark_merged(&self) {
        if let Err(e) = self.storage.set(&self.key, "true") {
            warn!(key = %self.key, "Failed to persist merge flag: {:#}", e);
        }
    }

    pub fn reset(&self) {
        if let Err(e) = self.storage.remove(&self.key) {
            warn!(key = %self.key, "Failed to clear merge flag: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_flag_lifecycle() {
        let storage = Arc::new(MemoryStorage::new());
        let state = SyncState::new(storage.clone(), "team4s_watchlist_synced");
        assert!(!state.is_merged());

        state.mark_merged();
        assert!(state.is_merged());
        assert_eq!(storage.get("team4s_watchlist_synced").unwrap(), Some("true".to_string()));

        state.reset();
        assert!(!state.is_merged());
    }

    #[test]
    fn test_unexpected_value_is_not_merged() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("flag", "yes").unwrap();
        assert!(!SyncState::new(storage, "flag").is_merged());
    }
}
