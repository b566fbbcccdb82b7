use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use watchlist_config::ApiConfig;
use watchlist_models::{RemoteEntry, SyncItem, SyncReport, WatchlistPage, WatchlistStatus};
use crate::api;
use crate::auth::{create_http_client, TokenProvider};
use crate::error::RemoteError;
use crate::traits::RemoteStore;

/// Largest id list the server accepts on `POST /watchlist/check`
pub const CHECK_BATCH_LIMIT: usize = 100;

#[derive(Clone)]
pub struct HttpRemoteStore {
    client: Arc<Client>,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client: Arc::new(create_http_client(Duration::from_secs(15))),
            base_url: base_url.into(),
            tokens,
        }
    }

    pub fn from_config(config: &ApiConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client: Arc::new(create_http_client(Duration::from_secs(config.timeout_seconds))),
            base_url: config.base_url.clone(),
            tokens,
        }
    }

    fn access_token(&self) -> Result<String, RemoteError> {
        self.tokens.access_token().ok_or_else(RemoteError::missing_credential)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_all(&self) -> Result<WatchlistPage, RemoteError> {
        let token = self.access_token()?;
        api::get_watchlist(&self.client, &self.base_url, &token).await
    }

    async fn fetch_status(&self, anime_id: i64) -> Result<Option<RemoteEntry>, RemoteError> {
        let token = self.access_token()?;
        api::get_watchlist_entry(&self.client, &self.base_url, &token, anime_id).await
    }

    async fn upsert(&self, anime_id: i64, status: WatchlistStatus) -> Result<RemoteEntry, RemoteError> {
        let token = self.access_token()?;
        api::add_to_watchlist(&self.client, &self.base_url, &token, anime_id, status).await
    }

    async fn update(&self, anime_id: i64, status: WatchlistStatus) -> Result<RemoteEntry, RemoteError> {
        let token = self.access_token()?;
        api::update_watchlist_status(&self.client, &self.base_url, &token, anime_id, status).await
    }

    async fn remove(&self, anime_id: i64) -> Result<(), RemoteError> {
        let token = self.access_token()?;
        api::remove_from_watchlist(&self.client, &self.base_url, &token, anime_id).await
    }

    async fn bulk_sync(&self, items: &[SyncItem]) -> Result<SyncReport, RemoteError> {
        let token = self.access_token()?;
        let report = api::sync_watchlist(&self.client, &self.base_url, &token, items).await?;
        info!(
            submitted = items.len(),
            synced = report.synced,
            skipped = report.skipped,
            invalid = report.invalid,
            "Bulk sync committed"
        );
        Ok(report)
    }

    async fn bulk_check(&self, anime_ids: &[i64]) -> Result<HashMap<i64, WatchlistStatus>, RemoteError> {
        if anime_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let token = self.access_token()?;

        let batches = anime_ids.chunks(CHECK_BATCH_LIMIT).map(|batch| {
            debug!(batch_size = batch.len(), "Checking watchlist statuses");
            api::check_watchlist(&self.client, &self.base_url, &token, batch)
        });
        let found = try_join_all(batches).await?;
        Ok(found.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    fn store_for(server: &ServerGuard, token: Option<&str>) -> HttpRemoteStore {
        let tokens: Arc<dyn TokenProvider> = match token {
            Some(t) => Arc::new(StaticToken::new(t)),
            None => Arc::new(StaticToken::none()),
        };
        HttpRemoteStore::new(format!("{}/api/v1", server.url()), tokens)
    }

    fn entry_body(anime_id: i64, status: &str) -> String {
        json!({
            "id": 1,
            "anime_id": anime_id,
            "user_id": 9,
            "status": status,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z"
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_fetch_status_sends_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/watchlist/42")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(entry_body(42, "planned"))
            .create_async()
            .await;

        let store = store_for(&server, Some("secret"));
        let entry = store.fetch_status(42).await.unwrap().unwrap();

        mock.assert_async().await;
        assert_eq!(entry.anime_id, 42);
        assert_eq!(entry.status, WatchlistStatus::Planned);
    }

    #[tokio::test]
    async fn test_fetch_status_translates_404_to_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/watchlist/7")
            .with_status(404)
            .with_body(r#"{"error":"not in watchlist"}"#)
            .create_async()
            .await;

        let store = store_for(&server, Some("secret"));
        assert!(store.fetch_status(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/watchlist")
            .expect(0)
            .create_async()
            .await;

        let store = store_for(&server, None);
        let err = store.fetch_all().await.unwrap_err();

        mock.assert_async().await;
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_unauthorized_response_is_distinct() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/watchlist/3")
            .with_status(401)
            .with_body(r#"{"error":"token expired"}"#)
            .create_async()
            .await;

        let store = store_for(&server, Some("stale"));
        let err = store.upsert(3, WatchlistStatus::Done).await.unwrap_err();
        match err {
            RemoteError::Unauthorized { status, message } => {
                assert_eq!(status, Some(401));
                assert_eq!(message, "token expired");
            }
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_carries_status_and_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/api/v1/watchlist/3")
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let store = store_for(&server, Some("secret"));
        let err = store.update(3, WatchlistStatus::Break).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "server returned 500: HTTP 500");
    }

    #[tokio::test]
    async fn test_upsert_posts_status_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/watchlist/11")
            .match_body(Matcher::Json(json!({"status": "watching"})))
            .with_status(200)
            .with_body(entry_body(11, "watching"))
            .create_async()
            .await;

        let store = store_for(&server, Some("secret"));
        let entry = store.upsert(11, WatchlistStatus::Watching).await.unwrap();

        mock.assert_async().await;
        assert_eq!(entry.status, WatchlistStatus::Watching);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let mut server = Server::new_async().await;
        let _first = server
            .mock("DELETE", "/api/v1/watchlist/5")
            .with_status(204)
            .create_async()
            .await;
        let store = store_for(&server, Some("secret"));
        store.remove(5).await.unwrap();

        let _gone = server
            .mock("DELETE", "/api/v1/watchlist/6")
            .with_status(404)
            .with_body(r#"{"error":"not in watchlist"}"#)
            .create_async()
            .await;
        store.remove(6).await.unwrap();
    }

    #[tokio::test]
    async fn test_bulk_sync_returns_server_counts() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/watchlist/sync")
            .match_body(Matcher::Json(json!({
                "items": [{
                    "anime_id": 42,
                    "status": "planned",
                    "added_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-01T00:00:00Z"
                }]
            })))
            .with_status(200)
            .with_body(r#"{"synced":1,"skipped":0,"invalid":0}"#)
            .create_async()
            .await;

        let at = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let items = vec![SyncItem {
            anime_id: 42,
            status: WatchlistStatus::Planned,
            added_at: at,
            updated_at: at,
        }];

        let store = store_for(&server, Some("secret"));
        let report = store.bulk_sync(&items).await.unwrap();

        mock.assert_async().await;
        assert_eq!(report, SyncReport { synced: 1, skipped: 0, invalid: 0 });
    }

    #[tokio::test]
    async fn test_bulk_check_splits_into_batches() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/watchlist/check")
            .with_status(200)
            .with_body(r#"{"statuses":{"1":"done"}}"#)
            .expect(2)
            .create_async()
            .await;

        let ids: Vec<i64> = (1..=150).collect();
        let store = store_for(&server, Some("secret"));
        let statuses = store.bulk_check(&ids).await.unwrap();

        mock.assert_async().await;
        assert_eq!(statuses.get(&1), Some(&WatchlistStatus::Done));
    }

    #[tokio::test]
    async fn test_bulk_check_with_no_ids_skips_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/watchlist/check")
            .expect(0)
            .create_async()
            .await;

        let store = store_for(&server, Some("secret"));
        assert!(store.bulk_check(&[]).await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_all_rejects_malformed_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/watchlist")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let store = store_for(&server, Some("secret"));
        let err = store.fetch_all().await.unwrap_err();
        assert!(matches!(err, RemoteError::Decode(_)));
    }
}
