use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use crate::status::WatchlistStatus;
use crate::watchlist::WatchlistEntry;

/// Anime summary embedded in `GET /watchlist` rows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimeSummary {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub anime_type: String,
    pub status: String,
    pub year: Option<i32>,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub max_episodes: i32,
}

/// Server-side watchlist entry for the authenticated account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteEntry {
    pub id: i64,
    pub anime_id: i64,
    pub status: WatchlistStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anime: Option<AnimeSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WatchlistMeta {
    pub total: usize,
    #[serde(default)]
    pub by_status: BTreeMap<WatchlistStatus, usize>,
}

/// Response of `GET /watchlist`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WatchlistPage {
    #[serde(default)]
    pub data: Vec<RemoteEntry>,
    #[serde(default)]
    pub meta: WatchlistMeta,
}

/// Body of `POST`/`PUT /watchlist/{animeId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: WatchlistStatus,
}

/// One locally-originated entry submitted to `POST /watchlist/sync`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncItem {
    pub anime_id: i64,
    pub status: WatchlistStatus,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&WatchlistEntry> for SyncItem {
    fn from(entry: &WatchlistEntry) -> Self {
        Self {
            anime_id: entry.anime_id,
            status: entry.status,
            added_at: entry.added_at,
            updated_at: entry.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub items: Vec<SyncItem>,
}

/// What the server committed for a `bulk_sync` call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub synced: usize,
    pub skipped: usize,
    pub invalid: usize,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.synced + self.skipped + self.invalid
    }

    /// Accumulate the counts of another batch
    pub fn absorb(&mut self, other: SyncReport) {
        self.synced += other.synced;
        self.skipped += other.skipped;
        self.invalid += other.invalid;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    pub anime_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckResponse {
    #[serde(default)]
    pub statuses: HashMap<i64, WatchlistStatus>,
}
