use async_trait::async_trait;
use std::collections::HashMap;
use watchlist_models::{RemoteEntry, SyncItem, SyncReport, WatchlistPage, WatchlistStatus};
use crate::error::RemoteError;

/// Server-authoritative watchlist of the authenticated account
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All entries with embedded anime summaries, plus per-status counts
    async fn fetch_all(&self) -> Result<WatchlistPage, RemoteError>;

    /// `None` when the anime is not tracked
    async fn fetch_status(&self, anime_id: i64) -> Result<Option<RemoteEntry>, RemoteError>;

    /// Create or overwrite the entry
    async fn upsert(&self, anime_id: i64, status: WatchlistStatus) -> Result<RemoteEntry, RemoteError>;

    /// Change the status of an existing entry
    async fn update(&self, anime_id: i64, status: WatchlistStatus) -> Result<RemoteEntry, RemoteError>;

    /// Idempotent; removing an untracked anime succeeds
    async fn remove(&self, anime_id: i64) -> Result<(), RemoteError>;

    /// Submit locally-originated entries; the server resolves conflicts by `updated_at`
    async fn bulk_sync(&self, items: &[SyncItem]) -> Result<SyncReport, RemoteError>;

    /// Status of every tracked anime among `anime_ids`; untracked ids are absent
    async fn bulk_check(&self, anime_ids: &[i64]) -> Result<HashMap<i64, WatchlistStatus>, RemoteError>;
}
