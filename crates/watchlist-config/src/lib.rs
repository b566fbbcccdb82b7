pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{ApiConfig, Config, LoggingConfig, StorageConfig};
pub use credentials::CredentialStore;
pub use paths::{container_base_path, PathManager};
