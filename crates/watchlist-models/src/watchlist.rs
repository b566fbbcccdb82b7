use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::status::WatchlistStatus;

/// One tracked anime in the device-scoped (guest) watchlist.
///
/// Serialized with camelCase keys so the stored array reads
/// `[{"animeId": 42, "status": "planned", "addedAt": ..., "updatedAt": ...}]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub anime_id: i64,
    pub status: WatchlistStatus,
    pub added_at: DateTime<Utc>, // Set once on creation
    pub updated_at: DateTime<Utc>, // Bumped on every status write
}

impl WatchlistEntry {
    pub fn new(anime_id: i64, status: WatchlistStatus, now: DateTime<Utc>) -> Self {
        Self {
            anime_id,
            status,
            added_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the status in place, keeping `added_at`
    pub fn set_status(&mut self, status: WatchlistStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}
