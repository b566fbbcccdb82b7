pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod traits;

pub use auth::{create_http_client, CredentialFileToken, StaticToken, TokenProvider};
pub use client::HttpRemoteStore;
pub use error::RemoteError;
pub use traits::RemoteStore;
