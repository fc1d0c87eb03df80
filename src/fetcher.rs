//! Page fetcher abstraction for retrieving results pages.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;

use crate::proxy::ProxyConfig;
use crate::Result;

/// One outbound GET.
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    /// Fully qualified results URL.
    pub url: &'a str,
    /// Headers to attach, user agent included.
    pub headers: HeaderMap,
    /// Proxy to route through, if any.
    pub proxy: Option<&'a ProxyConfig>,
}

impl<'a> FetchRequest<'a> {
    /// Creates a direct request with no headers.
    pub fn new(url: &'a str) -> Self {
        Self {
            url,
            headers: HeaderMap::new(),
            proxy: None,
        }
    }

    /// Sets the request headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Routes the request through `proxy`.
    pub fn with_proxy(mut self, proxy: Option<&'a ProxyConfig>) -> Self {
        self.proxy = proxy;
        self
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl RawResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Issues requests for the search orchestrator.
///
/// Implementations must return promptly once `cancel` fires, reporting
/// [`TransportError::Cancelled`](crate::TransportError::Cancelled), and must
/// surface every network failure as a [`TransportError`](crate::TransportError).
/// Any status code, 4xx and 5xx included, is a completed response.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the page described by `request`.
    async fn fetch(
        &self,
        request: FetchRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<RawResponse>;
}
