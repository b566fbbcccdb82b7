use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use watchlist_models::{
    ListedEntry, StatusCounts, SyncItem, SyncReport, WatchlistStatus,
};
use watchlist_remote::{RemoteError, RemoteStore};
use crate::auth::AuthSignal;
use crate::error::WatchlistError;
use crate::local::LocalStore;
use crate::sync_state::SyncState;


/// Largest item list the server accepts on one sync request
pub const SYNC_BATCH_LIMIT: usize = 1000;

/// Whether an anime is on the watchlist, and with which status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "status", rename_all = "lowercase")]
pub enum TrackState {
    Untracked,
    Tracked(WatchlistStatus),
}

impl TrackState {
    pub fn status(&self) -> Option<WatchlistStatus> {
        match self {
            TrackState::Untracked => None,
            TrackState::Tracked(status) => Some(*status),
        }
    }
}

impl From<Option<WatchlistStatus>> for TrackState {
    fn from(status: Option<WatchlistStatus>) -> Self {
        status.map_or(TrackState::Untracked, TrackState::Tracked)
    }
}

/// Full listing from whichever store is active
#[derive(Debug, Clone, Serialize)]
pub struct WatchlistListing {
    pub entries: Vec<ListedEntry>,
    pub counts: StatusCounts,
}

/// Result of a merge attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The flag was already set for this session
    AlreadyMerged,
    /// Local store was empty; the flag is now set
    NothingToMerge,
    Merged(SyncReport),
    /// The attempt failed and local data was kept for the next try
    Deferred(String),
}

impl MergeOutcome {
    /// Informational line for the user, only when something was carried over
    pub fn summary(&self) -> Option<String> {
        match self {
            MergeOutcome::Merged(report) if report.synced + report.skipped > 0 => {
                let mut summary = format!(
                    "Merged {} {} from this device into your account",
                    report.synced,
                    if report.synced == 1 { "entry" } else { "entries" }
                );
                if report.skipped > 0 {
                    summary.push_str(&format!(" ({} already up to date)", report.skipped));
                }
                Some(summary)
            }
            _ => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, MergeOutcome::Deferred(_))
    }
}

/// In-memory view shown to the user, with per-key request tokens.
///
/// Each optimistic write takes a new token for its key; a completion only
/// lands if its token is still the latest for that key.
#[derive(Default)]
struct DisplayedView {
    states: HashMap<i64, TrackState>,
    latest: HashMap<i64, u64>,
    next_token: u64,
}

impl DisplayedView {
    fn begin(&mut self, anime_id: i64, optimistic: TrackState) -> u64 {
        self.next_token += 1;
        self.latest.insert(anime_id, self.next_token);
        self.states.insert(anime_id, optimistic);
        self.next_token
    }

    fn current_token(&self, anime_id: i64) -> u64 {
        self.latest.get(&anime_id).copied().unwrap_or(0)
    }

    /// Apply `state` only if no newer request for the key was issued since `token`
    fn settle(&mut self, anime_id: i64, token: u64, state: Option<TrackState>) -> bool {
        if self.current_token(anime_id) != token {
            return false;
        }
        match state {
            Some(state) => self.states.insert(anime_id, state),
            None => self.states.remove(&anime_id),
        };
        true
    }
}

struct Inner {
    auth: AuthSignal,
    local: LocalStore,
    remote: Arc<dyn RemoteStore>,
    sync_state: SyncState,
    view: Mutex<DisplayedView>,
    merge_task: tokio::sync::Mutex<Option<JoinHandle<MergeOutcome>>>,
}

/// Single entry point for watchlist reads and writes.
///
/// Every call is routed by the auth signal at the moment it is made: signed
/// in goes to the server, signed out goes to the device-local store. The
/// first transition to signed in uploads the local list once.
#[derive(Clone)]
pub struct WatchlistCoordinator {
    inner: Arc<Inner>,
}

impl WatchlistCoordinator {
    pub fn new(
        auth: AuthSignal,
        local: LocalStore,
        sync_state: SyncState,
        remote: Arc<dyn RemoteStore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                auth,
                local,
                remote,
                sync_state,
                view: Mutex::new(DisplayedView::default()),
                merge_task: tokio::sync::Mutex::new(None),
            }),
        }
    }

    pub fn auth(&self) -> &AuthSignal {
        &self.inner.auth
    }

    pub fn local(&self) -> &LocalStore {
        &self.inner.local
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.inner.sync_state
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.auth.is_authenticated()
    }

    fn view(&self) -> std::sync::MutexGuard<'_, DisplayedView> {
        self.inner.view.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Last state shown for `anime_id`, `None` if never loaded or written
    pub fn displayed_status(&self, anime_id: i64) -> Option<TrackState> {
        self.view().states.get(&anime_id).copied()
    }

    /// Map a remote failure to the caller-facing error; an auth rejection signs the session out
    fn remote_failure(&self, operation: &str, err: RemoteError) -> WatchlistError {
        if err.is_unauthorized() {
            warn!(operation, "Server rejected credentials, switching to signed-out mode: {}", err);
            self.inner.auth.set_authenticated(false);
        } else {
            warn!(operation, "Watchlist request failed: {}", err);
        }
        WatchlistError::from(err)
    }

    #[instrument(skip(self))]
    pub async fn track_state(&self, anime_id: i64) -> Result<TrackState, WatchlistError> {
        let token = self.view().current_token(anime_id);

        let state = if self.is_authenticated() {
            let entry = self
                .inner
                .remote
                .fetch_status(anime_id)
                .await
                .map_err(|e| self.remote_failure("fetch_status", e))?;
            TrackState::from(entry.map(|entry| entry.status))
        } else {
            TrackState::from(self.inner.local.read_status(anime_id))
        };

        self.view().settle(anime_id, token, Some(state));
        Ok(state)
    }

    pub async fn status(&self, anime_id: i64) -> Result<Option<WatchlistStatus>, WatchlistError> {
        self.track_state(anime_id).await.map(|state| state.status())
    }

    #[instrument(skip(self))]
    pub async fn set_status(&self, anime_id: i64, status: WatchlistStatus) -> Result<(), WatchlistError> {
        if !self.is_authenticated() {
            self.inner.local.upsert(anime_id, status);
            let mut view = self.view();
            let token = view.current_token(anime_id);
            view.settle(anime_id, token, Some(TrackState::Tracked(status)));
            return Ok(());
        }

        let (snapshot, token) = {
            let mut view = self.view();
            let snapshot = view.states.get(&anime_id).copied();
            (snapshot, view.begin(anime_id, TrackState::Tracked(status)))
        };

        match self.inner.remote.upsert(anime_id, status).await {
            Ok(entry) => {
                self.view().settle(anime_id, token, Some(TrackState::Tracked(entry.status)));
                Ok(())
            }
            Err(e) => {
                let err = self.remote_failure("set_status", e);
                self.roll_back(anime_id, token, snapshot, err.is_unauthorized()).await;
                Err(err)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, anime_id: i64) -> Result<(), WatchlistError> {
        if !self.is_authenticated() {
            self.inner.local.remove(anime_id);
            let mut view = self.view();
            let token = view.current_token(anime_id);
            view.settle(anime_id, token, Some(TrackState::Untracked));
            return Ok(());
        }

        let (snapshot, token) = {
            let mut view = self.view();
            let snapshot = view.states.get(&anime_id).copied();
            (snapshot, view.begin(anime_id, TrackState::Untracked))
        };

        match self.inner.remote.remove(anime_id).await {
            Ok(()) => {
                self.view().settle(anime_id, token, Some(TrackState::Untracked));
                Ok(())
            }
            Err(e) => {
                let err = self.remote_failure("remove", e);
                self.roll_back(anime_id, token, snapshot, err.is_unauthorized()).await;
                Err(err)
            }
        }
    }

    /// Replace a failed optimistic value with the server's current one for
    /// that key, or the pre-call snapshot if the server can't be asked.
    async fn roll_back(&self, anime_id: i64, token: u64, snapshot: Option<TrackState>, skip_refetch: bool) {
        let restored = if skip_refetch {
            snapshot
        } else {
            match self.inner.remote.fetch_status(anime_id).await {
                Ok(entry) => Some(TrackState::from(entry.map(|entry| entry.status))),
                Err(e) => {
                    debug!(anime_id, "Re-fetch after failed write also failed, restoring snapshot: {}", e);
                    snapshot
                }
            }
        };

        if self.view().settle(anime_id, token, restored) {
            info!(anime_id, restored = ?restored, "Rolled back optimistic watchlist change");
        } else {
            debug!(anime_id, "Newer request superseded rollback");
        }
    }

    pub async fn list(&self) -> Result<WatchlistListing, WatchlistError> {
        if self.is_authenticated() {
            let page = self
                .inner
                .remote
                .fetch_all()
                .await
                .map_err(|e| self.remote_failure("fetch_all", e))?;
            let entries: Vec<ListedEntry> = page.data.into_iter().map(ListedEntry::from).collect();
            return Ok(WatchlistListing {
                entries,
                counts: StatusCounts::from(page.meta),
            });
        }

        let entries: Vec<ListedEntry> = self
            .inner
            .local
            .read_all()
            .into_iter()
            .map(ListedEntry::from)
            .collect();
        let counts = StatusCounts::from_statuses(entries.iter().map(|entry| entry.status));
        Ok(WatchlistListing { entries, counts })
    }

    /// Statuses of the tracked ids among `anime_ids`
    pub async fn check(&self, anime_ids: &[i64]) -> Result<HashMap<i64, WatchlistStatus>, WatchlistError> {
        if self.is_authenticated() {
            return self
                .inner
                .remote
                .bulk_check(anime_ids)
                .await
                .map_err(|e| self.remote_failure("bulk_check", e));
        }

        Ok(self
            .inner
            .local
            .read_all()
            .into_iter()
            .filter(|entry| anime_ids.contains(&entry.anime_id))
            .map(|entry| (entry.anime_id, entry.status))
            .collect())
    }

    /// React to a signed-out to signed-in transition.
    ///
    /// Starts the background merge unless the session is already merged or a
    /// merge is still running. Returns whether a merge was started.
    pub async fn handle_login(&self) -> bool {
        if self.inner.sync_state.is_merged() {
            debug!(operation = "merge_skip", "Session already merged");
            return false;
        }

        let mut slot = self.inner.merge_task.lock().await;
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!(operation = "merge_skip", "Merge already in flight");
            return false;
        }

        let coordinator = self.clone();
        *slot = Some(tokio::spawn(async move {
            match coordinator.try_merge().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(operation = "merge_deferred", "Merge failed, keeping local entries: {}", e);
                    MergeOutcome::Deferred(e.to_string())
                }
            }
        }));
        true
    }

    /// Wait for the background merge started by [`handle_login`](Self::handle_login)
    pub async fn wait_for_merge(&self) -> Option<MergeOutcome> {
        let handle = self.inner.merge_task.lock().await.take()?;
        Some(join_outcome(handle.await))
    }

    pub async fn handle_logout(&self) {
        if let Some(handle) = self.inner.merge_task.lock().await.take() {
            // Aborting only lands at the next await; a merge past its last
            // request must finish before the flag is reset.
            handle.abort();
            match handle.await {
                Ok(outcome) => debug!(operation = "logout", outcome = ?outcome, "Merge finished before logout"),
                Err(e) if e.is_cancelled() => debug!(operation = "logout", "Merge cancelled"),
                Err(e) => warn!(operation = "logout", "Merge task failed: {}", e),
            }
        }
        self.inner.sync_state.reset();
        *self.view() = DisplayedView::default();
        info!(operation = "logout", "Merge flag cleared");
    }

    /// Explicit merge retry. Waits for an in-flight merge first; errors are returned instead of deferred.
    pub async fn merge_now(&self) -> Result<MergeOutcome, WatchlistError> {
        if !self.is_authenticated() {
            return Err(WatchlistError::NotLoggedIn);
        }

        let mut slot = self.inner.merge_task.lock().await;
        if let Some(handle) = slot.take() {
            let outcome = join_outcome(handle.await);
            if !outcome.is_deferred() {
                return Ok(outcome);
            }
        }
        self.try_merge().await
    }

    async fn try_merge(&self) -> Result<MergeOutcome, WatchlistError> {
        if self.inner.sync_state.is_merged() {
            return Ok(MergeOutcome::AlreadyMerged);
        }

        let entries = self.inner.local.read_all();
        if entries.is_empty() {
            self.inner.sync_state.mark_merged();
            info!(operation = "merge_complete", "No local entries to merge");
            return Ok(MergeOutcome::NothingToMerge);
        }

        info!(operation = "merge_start", entries = entries.len(), "Merging local watchlist into account");
        let items: Vec<SyncItem> = entries.iter().map(SyncItem::from).collect();

        // A failed later batch leaves local data intact; re-sending earlier
        // batches is harmless since the server skips entries that aren't newer.
        let mut report = SyncReport::default();
        for batch in items.chunks(SYNC_BATCH_LIMIT) {
            let batch_report = self
                .inner
                .remote
                .bulk_sync(batch)
                .await
                .map_err(|e| self.remote_failure("bulk_sync", e))?;
            report.absorb(batch_report);
        }

        self.inner.local.clear();
        self.inner.sync_state.mark_merged();
        info!(
            operation = "merge_complete",
            synced = report.synced,
            skipped = report.skipped,
            invalid = report.invalid,
            "Local watchlist merged"
        );
        Ok(MergeOutcome::Merged(report))
    }

    /// Follow auth transitions on `receiver` until the sender is dropped
    pub fn watch_auth(&self, mut receiver: watch::Receiver<bool>) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut authenticated = *receiver.borrow_and_update();
            if authenticated {
                coordinator.handle_login().await;
            }

            while receiver.changed().await.is_ok() {
                let now = *receiver.borrow_and_update();
                if now == authenticated {
                    continue;
                }
                authenticated = now;
                if now {
                    coordinator.handle_login().await;
                } else {
                    coordinator.handle_logout().await;
                }
            }
        })
    }
}

fn join_outcome(result: Result<MergeOutcome, tokio::task::JoinError>) -> MergeOutcome {
    result.unwrap_or_else(|e| MergeOutcome::Deferred(format!("merge task ended early: {}", e)))
}
