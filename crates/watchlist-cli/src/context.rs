use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use watchlist_config::{Config, CredentialStore, PathManager};
use watchlist_core::{AuthSignal, FileStorage, LocalStore, SyncState, WatchlistCoordinator, WatchlistError};
use watchlist_remote::{CredentialFileToken, HttpRemoteStore};

/// Everything a command needs, wired from the config file and stored credentials
pub struct AppContext {
    pub paths: PathManager,
    pub config: Config,
    pub config_file: PathBuf,
    pub coordinator: WatchlistCoordinator,
}

impl AppContext {
    pub fn load() -> Result<Self> {
        let paths = PathManager::default();
        let config_file = paths.config_file();
        let config = Config::load_or_default(&config_file)
            .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
        config
            .validate()
            .map_err(|e| eyre!("Invalid configuration in {}: {}", config_file.display(), e))?;

        let storage = Arc::new(
            FileStorage::from_config(&config.storage, &paths).map_err(|e| eyre!("{:#}", e))?,
        );
        let local = LocalStore::new(storage.clone(), config.storage.watchlist_key.clone());
        let sync_state = SyncState::new(storage, config.storage.sync_flag_key.clone());

        let credentials = CredentialStore::open(paths.credentials_file())
            .map_err(|e| eyre!("Failed to read credentials: {}", e))?;
        let auth = AuthSignal::new(credentials.has_session());

        let tokens = Arc::new(CredentialFileToken::new(paths.credentials_file()));
        let remote = Arc::new(HttpRemoteStore::from_config(&config.api, tokens));
        let coordinator = WatchlistCoordinator::new(auth, local, sync_state, remote);

        Ok(Self {
            paths,
            config,
            config_file,
            coordinator,
        })
    }

    pub fn credentials(&self) -> Result<CredentialStore> {
        CredentialStore::open(self.paths.credentials_file())
            .map_err(|e| eyre!("Failed to read credentials: {}", e))
    }

    /// Drop the stored session and the merge flag
    pub async fn end_session(&self) -> Result<()> {
        let mut credentials = self.credentials()?;
        credentials.clear_session();
        credentials
            .save()
            .map_err(|e| eyre!("Failed to save credentials: {}", e))?;

        self.coordinator.auth().set_authenticated(false);
        self.coordinator.handle_logout().await;
        Ok(())
    }

    /// Turn a coordinator error into a report, ending the session if the server rejected it
    pub async fn fail(&self, err: WatchlistError) -> color_eyre::Report {
        if err.is_unauthorized() {
            if let Err(e) = self.end_session().await {
                warn!("Failed to clear rejected session: {}", e);
            }
        }
        eyre!(err.user_message())
    }
}
