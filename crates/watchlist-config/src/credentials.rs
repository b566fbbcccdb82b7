use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

/// Token storage for the portal account. Tokens are issued elsewhere; this only keeps them.
pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    /// Construct and load in one step
    pub fn open(path: PathBuf) -> Result<Self> {
        let mut store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    pub fn get_access_token(&self) -> Option<&String> {
        self.get("access_token").filter(|token| !token.is_empty())
    }

    pub fn set_access_token(&mut self, token: String) {
        self.set("access_token".to_string(), token);
    }

    pub fn get_refresh_token(&self) -> Option<&String> {
        self.get("refresh_token")
    }

    pub fn set_refresh_token(&mut self, token: String) {
        self.set("refresh_token".to_string(), token);
    }

    pub fn get_logged_in_at(&self) -> Option<DateTime<Utc>> {
        self.get("logged_in_at")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn set_logged_in_at(&mut self, at: DateTime<Utc>) {
        self.set("logged_in_at".to_string(), at.to_rfc3339());
    }

    pub fn has_session(&self) -> bool {
        self.get_access_token().is_some()
    }

    /// Drop every token-related entry
    pub fn clear_session(&mut self) {
        self.remove("access_token");
        self.remove("refresh_token");
        self.remove("logged_in_at");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_credential_store_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut store = CredentialStore::new(path.clone());
        store.set_access_token("access".to_string());
        store.set_refresh_token("refresh".to_string());
        store.save().unwrap();

        let loaded = CredentialStore::open(path).unwrap();
        assert_eq!(loaded.get_access_token(), Some(&"access".to_string()));
        assert_eq!(loaded.get_refresh_token(), Some(&"refresh".to_string()));
        assert!(loaded.has_session());
    }

    #[test]
    fn test_logged_in_at_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut store = CredentialStore::new(path.clone());
        let at = Utc::now();
        store.set_logged_in_at(at);
        store.save().unwrap();

        let loaded = CredentialStore::open(path).unwrap();
        let loaded_at = loaded.get_logged_in_at().unwrap();
        assert!((loaded_at - at).num_seconds().abs() < 2);
    }

    #[test]
    fn test_clear_session() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/unused"));
        store.set_access_token("a".to_string());
        store.set_refresh_token("r".to_string());
        store.set("other".to_string(), "kept".to_string());

        store.clear_session();
        assert!(!store.has_session());
        assert_eq!(store.get_refresh_token(), None);
        assert_eq!(store.get("other"), Some(&"kept".to_string()));
    }

    #[test]
    fn test_empty_token_is_not_a_session() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/unused"));
        store.set_access_token(String::new());
        assert!(!store.has_session());
    }
}
