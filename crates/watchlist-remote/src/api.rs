use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;
use watchlist_models::{
    CheckRequest, CheckResponse, RemoteEntry, StatusRequest, SyncItem, SyncReport, SyncRequest,
    WatchlistPage, WatchlistStatus,
};
use crate::error::RemoteError;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn authorized(request: RequestBuilder, access_token: &str) -> RequestBuilder {
    request
        .header("Authorization", format!("Bearer {}", access_token))
        .header("Accept", "application/json")
}

/// Turn a non-success response into a typed error, preferring the server's `error` field
async fn error_from_response(response: Response) -> RemoteError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .map(|b| b.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        RemoteError::Unauthorized {
            status: Some(status.as_u16()),
            message,
        }
    } else {
        RemoteError::Http {
            status: status.as_u16(),
            message,
        }
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, RemoteError> {
    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    parse_json(response).await
}

/// `GET /watchlist`
pub async fn get_watchlist(client: &Client, base_url: &str, access_token: &str) -> Result<WatchlistPage, RemoteError> {
    let url = endpoint(base_url, "watchlist");
    let page: WatchlistPage = send_json(authorized(client.get(&url), access_token)).await?;
    debug!(entries = page.data.len(), total = page.meta.total, "Fetched remote watchlist");
    Ok(page)
}

/// `GET /watchlist/{animeId}`; 404 means "not tracked"
pub async fn get_watchlist_entry(
    client: &Client,
    base_url: &str,
    access_token: &str,
    anime_id: i64,
) -> Result<Option<RemoteEntry>, RemoteError> {
    let url = endpoint(base_url, &format!("watchlist/{}", anime_id));
    let response = authorized(client.get(&url), access_token).send().await?;

    if response.status() == StatusCode::NOT_FOUND {
        debug!(anime_id, "Anime not tracked remotely");
        return Ok(None);
    }
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    parse_json(response).await.map(Some)
}

/// `POST /watchlist/{animeId}` (upsert)
pub async fn add_to_watchlist(
    client: &Client,
    base_url: &str,
    access_token: &str,
    anime_id: i64,
    status: WatchlistStatus,
) -> Result<RemoteEntry, RemoteError> {
    let url = endpoint(base_url, &format!("watchlist/{}", anime_id));
    send_json(authorized(client.post(&url), access_token).json(&StatusRequest { status })).await
}

/// `PUT /watchlist/{animeId}`
pub async fn update_watchlist_status(
    client: &Client,
    base_url: &str,
    access_token: &str,
    anime_id: i64,
    status: WatchlistStatus,
) -> Result<RemoteEntry, RemoteError> {
    let url = endpoint(base_url, &format!("watchlist/{}", anime_id));
    send_json(authorized(client.put(&url), access_token).json(&StatusRequest { status })).await
}

/// `DELETE /watchlist/{animeId}`; a 404 is treated as already removed
pub async fn remove_from_watchlist(
    client: &Client,
    base_url: &str,
    access_token: &str,
    anime_id: i64,
) -> Result<(), RemoteError> {
    let url = endpoint(base_url, &format!("watchlist/{}", anime_id));
    let response = authorized(client.delete(&url), access_token).send().await?;

    if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
        return Ok(());
    }
    Err(error_from_response(response).await)
}

/// `POST /watchlist/sync`
pub async fn sync_watchlist(
    client: &Client,
    base_url: &str,
    access_token: &str,
    items: &[SyncItem],
) -> Result<SyncReport, RemoteError> {
    let url = endpoint(base_url, "watchlist/sync");
    let body = SyncRequest { items: items.to_vec() };
    send_json(authorized(client.post(&url), access_token).json(&body)).await
}

/// `POST /watchlist/check`
pub async fn check_watchlist(
    client: &Client,
    base_url: &str,
    access_token: &str,
    anime_ids: &[i64],
) -> Result<HashMap<i64, WatchlistStatus>, RemoteError> {
    let url = endpoint(base_url, "watchlist/check");
    let body = CheckRequest { anime_ids: anime_ids.to_vec() };
    let response: CheckResponse = send_json(authorized(client.post(&url), access_token).json(&body)).await?;
    Ok(response.statuses)
}
