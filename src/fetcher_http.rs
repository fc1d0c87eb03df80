//! HTTP-based page fetcher using reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::fetcher::{FetchRequest, PageFetcher, RawResponse};
use crate::proxy::ProxyConfig;
use crate::{Result, SearchError, TransportError};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A page fetcher that uses plain HTTP requests via reqwest.
///
/// Direct requests share one client. reqwest binds proxies to a client, so
/// each proxied request gets a client of its own.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Creates an `HttpFetcher` with the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates an `HttpFetcher` whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Self::builder(timeout).build().map_err(|e| {
            SearchError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;
        Ok(Self { client, timeout })
    }

    /// Creates an `HttpFetcher` around a custom reqwest client. Proxied
    /// requests still build their own client with the default timeout.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    // System proxy variables are ignored: routing is decided by the rotator.
    fn builder(timeout: Duration) -> reqwest::ClientBuilder {
        Client::builder().timeout(timeout).no_proxy()
    }

    fn client_for(&self, proxy: Option<&ProxyConfig>) -> Result<Client> {
        let Some(proxy) = proxy else {
            return Ok(self.client.clone());
        };

        debug!("Using proxy: {}", proxy);
        let proxy = Proxy::all(proxy.url()).map_err(|e| {
            SearchError::Configuration(format!("Failed to create proxy {}: {}", proxy, e))
        })?;
        Self::builder(self.timeout)
            .proxy(proxy)
            .build()
            .map_err(|e| SearchError::Configuration(format!("Failed to create HTTP client: {}", e)))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(
        &self,
        request: FetchRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled.into());
        }

        let FetchRequest {
            url,
            headers,
            proxy,
        } = request;
        let client = self.client_for(proxy)?;
        let send = async move {
            let response = client.get(url).headers(headers).send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(RawResponse { status, body })
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled.into()),
            response = send => {
                let response = response.map_err(TransportError::from)?;
                debug!("GET {} -> {}", url, response.status);
                Ok(response)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetcher_new() {
        let fetcher = HttpFetcher::new().unwrap();
        assert_eq!(fetcher.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_http_fetcher_with_timeout() {
        let fetcher = HttpFetcher::with_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(fetcher.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_http_fetcher_with_client() {
        let client = Client::builder().user_agent("test-agent").build().unwrap();
        let _fetcher = HttpFetcher::with_client(client);
    }

    #[test]
    fn test_client_for_proxy() {
        let fetcher = HttpFetcher::new().unwrap();
        let proxy = ProxyConfig::new("127.0.0.1", 8080);
        assert!(fetcher.client_for(Some(&proxy)).is_ok());
        assert!(fetcher.client_for(None).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_already_cancelled() {
        let fetcher = HttpFetcher::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = fetcher
            .fetch(FetchRequest::new("http://127.0.0.1:9/"), &cancel)
            .await;
        assert!(matches!(
            result,
            Err(SearchError::Transport(TransportError::Cancelled))
        ));
    }
}
