use thiserror::Error;
use watchlist_remote::RemoteError;

#[derive(Debug, Error)]
pub enum WatchlistError {
    /// The server rejected the credential; the session has been marked signed out
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// An account-only operation was requested without a session
    #[error("not logged in")]
    NotLoggedIn,

    #[error(transparent)]
    Remote(RemoteError),
}

impl From<RemoteError> for WatchlistError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unauthorized { message, .. } => WatchlistError::Unauthorized(message),
            other => WatchlistError::Remote(other),
        }
    }
}

impl WatchlistError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, WatchlistError::Unauthorized(_))
    }

    /// One line suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            WatchlistError::Unauthorized(_) => {
                "Your session has expired. Please log in again.".to_string()
            }
            WatchlistError::NotLoggedIn => "You need to log in first.".to_string(),
            WatchlistError::Remote(RemoteError::Network(_)) => {
                "Could not reach the watchlist service. Please try again.".to_string()
            }
            WatchlistError::Remote(RemoteError::Http { status, message }) if *status >= 500 => {
                format!("The watchlist service is having trouble ({}). Please try again later.", message)
            }
            WatchlistError::Remote(RemoteError::Http { message, .. }) => {
                format!("The watchlist service rejected the request: {}", message)
            }
            WatchlistError::Remote(RemoteError::Decode(_)) => {
                "The watchlist service sent an unexpected response.".to_string()
            }
            WatchlistError::Remote(RemoteError::Unauthorized { .. }) => {
                "Your session has expired. Please log in again.".to_string()
            }
        }
    }
}
