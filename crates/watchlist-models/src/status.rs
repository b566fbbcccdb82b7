use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Watchlist status shared by the local and remote stores
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum WatchlistStatus {
    /// Currently watching
    Watching,
    /// Finished watching
    Done,
    /// Paused for now
    Break,
    /// Want to watch
    Planned,
    /// Stopped watching
    Dropped,
}

impl WatchlistStatus {
    /// All statuses in display order
    pub const ALL: [WatchlistStatus; 5] = [
        WatchlistStatus::Watching,
        WatchlistStatus::Done,
        WatchlistStatus::Break,
        WatchlistStatus::Planned,
        WatchlistStatus::Dropped,
    ];

    /// Wire name, identical to the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchlistStatus::Watching => "watching",
            WatchlistStatus::Done => "done",
            WatchlistStatus::Break => "break",
            WatchlistStatus::Planned => "planned",
            WatchlistStatus::Dropped => "dropped",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            WatchlistStatus::Watching => "Watching",
            WatchlistStatus::Done => "Done",
            WatchlistStatus::Break => "On break",
            WatchlistStatus::Planned => "Planned",
            WatchlistStatus::Dropped => "Dropped",
        }
    }
}

impl fmt::Display for WatchlistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(String);

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid watchlist status '{}' (expected one of: watching, done, break, planned, dropped)",
            self.0
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for WatchlistStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "watching" => Ok(WatchlistStatus::Watching),
            "done" => Ok(WatchlistStatus::Done),
            "break" => Ok(WatchlistStatus::Break),
            "planned" => Ok(WatchlistStatus::Planned),
            "dropped" => Ok(WatchlistStatus::Dropped),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}
