// Display-time helpers layered over either store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use crate::remote::{AnimeSummary, RemoteEntry, WatchlistMeta};
use crate::status::WatchlistStatus;
use crate::watchlist::WatchlistEntry;

/// Uniform listing row. Local rows carry no anime summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListedEntry {
    pub anime_id: i64,
    pub status: WatchlistStatus,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anime: Option<AnimeSummary>,
}

impl ListedEntry {
    /// Title if known, otherwise a placeholder built from the id
    pub fn display_title(&self) -> String {
        self.anime
            .as_ref()
            .map(|anime| anime.title.clone())
            .unwrap_or_else(|| format!("Anime #{}", self.anime_id))
    }
}

impl From<WatchlistEntry> for ListedEntry {
    fn from(entry: WatchlistEntry) -> Self {
        Self {
            anime_id: entry.anime_id,
            status: entry.status,
            added_at: entry.added_at,
            updated_at: entry.updated_at,
            anime: None,
        }
    }
}

impl From<RemoteEntry> for ListedEntry {
    fn from(entry: RemoteEntry) -> Self {
        Self {
            anime_id: entry.anime_id,
            status: entry.status,
            added_at: entry.created_at,
            updated_at: entry.updated_at,
            anime: entry.anime,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Most recently added first
    #[default]
    Added,
    /// Most recently updated first
    Updated,
    /// Alphabetical by title
    Title,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "added" => Ok(SortOrder::Added),
            "updated" => Ok(SortOrder::Updated),
            "title" => Ok(SortOrder::Title),
            _ => Err(format!("Invalid sort order: {}. Use 'added', 'updated', or 'title'", s)),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Added => f.write_str("added"),
            SortOrder::Updated => f.write_str("updated"),
            SortOrder::Title => f.write_str("title"),
        }
    }
}

pub fn sort_entries(entries: &mut [ListedEntry], order: SortOrder) {
    match order {
        SortOrder::Added => entries.sort_by(|a, b| {
            b.added_at.cmp(&a.added_at).then(a.anime_id.cmp(&b.anime_id))
        }),
        SortOrder::Updated => entries.sort_by(|a, b| {
            b.updated_at.cmp(&a.updated_at).then(a.anime_id.cmp(&b.anime_id))
        }),
        SortOrder::Title => entries.sort_by(|a, b| {
            a.display_title()
                .to_lowercase()
                .cmp(&b.display_title().to_lowercase())
                .then(a.anime_id.cmp(&b.anime_id))
        }),
    }
}

pub fn filter_by_status(entries: Vec<ListedEntry>, status: WatchlistStatus) -> Vec<ListedEntry> {
    entries.into_iter().filter(|entry| entry.status == status).collect()
}

/// Per-status counts; every status is present, zero-filled
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: usize,
    pub by_status: BTreeMap<WatchlistStatus, usize>,
}

impl StatusCounts {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = WatchlistStatus>,
    {
        let mut counts = Self::default();
        for status in statuses {
            *counts.by_status.entry(status).or_insert(0) += 1;
            counts.total += 1;
        }
        counts
    }

    pub fn get(&self, status: WatchlistStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

impl Default for StatusCounts {
    fn default() -> Self {
        Self {
            total: 0,
            by_status: WatchlistStatus::ALL.iter().map(|status| (*status, 0)).collect(),
        }
    }
}

impl From<WatchlistMeta> for StatusCounts {
    fn from(meta: WatchlistMeta) -> Self {
        let mut counts = Self::default();
        counts.by_status.extend(meta.by_status);
        counts.total = meta.total;
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn listed(anime_id: i64, status: WatchlistStatus, added_day: u32, updated_day: u32, title: Option<&str>) -> ListedEntry {
        ListedEntry {
            anime_id,
            status,
            added_at: Utc.with_ymd_and_hms(2024, 1, added_day, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, updated_day, 0, 0, 0).unwrap(),
            anime: title.map(|title| AnimeSummary {
                id: anime_id,
                title: title.to_string(),
                anime_type: "tv".to_string(),
                status: "finished".to_string(),
                year: None,
                cover_image: None,
                max_episodes: 12,
            }),
        }
    }

    #[test]
    fn test_sort_by_added_newest_first() {
        let mut entries = vec![
            listed(1, WatchlistStatus::Done, 1, 9, None),
            listed(2, WatchlistStatus::Done, 5, 5, None),
            listed(3, WatchlistStatus::Done, 3, 3, None),
        ];
        sort_entries(&mut entries, SortOrder::Added);
        let ids: Vec<i64> = entries.iter().map(|e| e.anime_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_sort_by_updated_newest_first() {
        let mut entries = vec![
            listed(1, WatchlistStatus::Done, 1, 9, None),
            listed(2, WatchlistStatus::Done, 5, 5, None),
        ];
        sort_entries(&mut entries, SortOrder::Updated);
        assert_eq!(entries[0].anime_id, 1);
    }

    #[test]
    fn test_sort_by_title_ignores_case() {
        let mut entries = vec![
            listed(1, WatchlistStatus::Done, 1, 1, Some("bakemonogatari")),
            listed(2, WatchlistStatus::Done, 1, 1, Some("Akira")),
            listed(3, WatchlistStatus::Done, 1, 1, Some("Cowboy Bebop")),
        ];
        sort_entries(&mut entries, SortOrder::Title);
        let titles: Vec<String> = entries.iter().map(|e| e.display_title()).collect();
        assert_eq!(titles, vec!["Akira", "bakemonogatari", "Cowboy Bebop"]);
    }

    #[test]
    fn test_filter_by_status() {
        let entries = vec![
            listed(1, WatchlistStatus::Done, 1, 1, None),
            listed(2, WatchlistStatus::Planned, 1, 1, None),
            listed(3, WatchlistStatus::Done, 1, 1, None),
        ];
        let done = filter_by_status(entries, WatchlistStatus::Done);
        assert_eq!(done.len(), 2);
    }

    #[test]
    fn test_status_counts_are_zero_filled() {
        let counts = StatusCounts::from_statuses(vec![
            WatchlistStatus::Watching,
            WatchlistStatus::Watching,
            WatchlistStatus::Dropped,
        ]);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.get(WatchlistStatus::Watching), 2);
        assert_eq!(counts.get(WatchlistStatus::Done), 0);
        assert_eq!(counts.by_status.len(), WatchlistStatus::ALL.len());
    }

    #[test]
    fn test_sort_order_from_str() {
        assert_eq!("Title".parse::<SortOrder>(), Ok(SortOrder::Title));
        assert!("rating".parse::<SortOrder>().is_err());
    }
}
