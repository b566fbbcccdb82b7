use thiserror::Error;

/// Failure of a call against the watchlist API
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Missing credential, or the server answered 401/403
    #[error("not authenticated: {message}")]
    Unauthorized { status: Option<u16>, message: String },

    /// Any other non-success response
    #[error("server returned {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection, timeout or transport failure
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// A 2xx response whose body did not match the expected shape
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn missing_credential() -> Self {
        RemoteError::Unauthorized {
            status: None,
            message: "no access token available".to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Unauthorized { status, .. } => *status,
            RemoteError::Http { status, .. } => Some(*status),
            RemoteError::Network(e) => e.status().map(|s| s.as_u16()),
            RemoteError::Decode(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RemoteError::Unauthorized { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accessor() {
        let err = RemoteError::Http { status: 500, message: "internal error".to_string() };
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_unauthorized());
        assert_eq!(err.to_string(), "server returned 500: internal error");

        let missing = RemoteError::missing_credential();
        assert!(missing.is_unauthorized());
        assert_eq!(missing.status(), None);
    }
}
