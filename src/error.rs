//! Error types for the search client.

use thiserror::Error;

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during a search.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Malformed proxy address or invalid options. No request was sent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request could not be completed at the network level.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The engine refused to serve results to this client.
    #[error("Search engine blocked the request")]
    Blocked,

    /// The engine stated that nothing matched the query.
    #[error("Search did not match any documents")]
    NoResults,

    /// Cancelled while waiting on the rate limiter.
    #[error("Search cancelled")]
    Cancelled,
}

impl SearchError {
    /// Returns true when the caller should back off before retrying.
    pub fn is_blocked(&self) -> bool {
        matches!(self, SearchError::Blocked)
    }

    /// Returns true for either kind of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            SearchError::Cancelled | SearchError::Transport(TransportError::Cancelled)
        )
    }
}

/// Network-level failures reported by a [`PageFetcher`](crate::PageFetcher).
#[derive(Error, Debug)]
pub enum TransportError {
    /// The cancellation token fired before or during the request.
    #[error("request cancelled")]
    Cancelled,

    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// DNS, connect, TLS or body read failure.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Http(err)
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Transport(err.into())
    }
}
