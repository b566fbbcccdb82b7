use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use watchlist_config::CredentialStore;

/// Create the shared HTTP client used for every watchlist call
pub fn create_http_client(timeout: Duration) -> Client {
    Client::builder()
        .user_agent(concat!("team4s-watchlist/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Supplies the bearer credential. Issuing and refreshing tokens happens elsewhere.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

/// Fixed token, mostly for tests and one-shot tools
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Reads the credentials file on every call, so a login or logout in another
/// process is picked up without restarting.
#[derive(Debug, Clone)]
pub struct CredentialFileToken {
    path: PathBuf,
}

impl CredentialFileToken {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenProvider for CredentialFileToken {
    fn access_token(&self) -> Option<String> {
        match CredentialStore::open(self.path.clone()) {
            Ok(store) => store.get_access_token().cloned(),
            Err(e) => {
                warn!("Failed to read credentials from {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_static_token() {
        assert_eq!(StaticToken::new("abc").access_token(), Some("abc".to_string()));
        assert_eq!(StaticToken::none().access_token(), None);
    }

    #[test]
    fn test_credential_file_token_follows_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.toml");
        let provider = CredentialFileToken::new(path.clone());
        assert_eq!(provider.access_token(), None);

        let mut store = CredentialStore::new(path.clone());
        store.set_access_token("fresh".to_string());
        store.save().unwrap();
        assert_eq!(provider.access_token(), Some("fresh".to_string()));

        store.clear_session();
        store.save().unwrap();
        assert_eq!(provider.access_token(), None);
    }
}
