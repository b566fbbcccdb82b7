pub mod listing;
pub mod remote;
pub mod status;
pub mod watchlist;

pub use listing::{filter_by_status, sort_entries, ListedEntry, SortOrder, StatusCounts};
pub use remote::{
    AnimeSummary, CheckRequest, CheckResponse, RemoteEntry, StatusRequest, SyncItem, SyncReport,
    SyncRequest, WatchlistMeta, WatchlistPage,
};
pub use status::{ParseStatusError, WatchlistStatus};
pub use watchlist::WatchlistEntry;
