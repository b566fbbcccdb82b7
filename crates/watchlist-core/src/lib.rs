pub mod auth;
pub mod coordinator;
pub mod error;
pub mod local;
pub mod storage;
pub mod sync_state;

pub use auth::AuthSignal;
pub use coordinator::{MergeOutcome, TrackState, WatchlistCoordinator, WatchlistListing, SYNC_BATCH_LIMIT};
pub use error::WatchlistError;
pub use local::{EmptyReason, LocalLoad, LocalStore};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use sync_state::SyncState;
