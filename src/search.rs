//! Search orchestration.
//!
//! A search runs top to bottom on the caller's task: normalize options, wait
//! on the rate limiter, build the URL, pick a proxy, fetch, classify, extract.
//! The caller's cancellation token is honoured at both waiting points.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::classify::{ClassifiedOutcome, Classifier};
use crate::config::SearchConfig;
use crate::disguise::{Disguise, RandomUserAgent, UserAgentSource};
use crate::endpoint::build_url;
use crate::extract::{DuckDuckGoExtractor, ResultExtractor};
use crate::fetcher::{FetchRequest, PageFetcher};
use crate::fetcher_http::HttpFetcher;
use crate::proxy::{ProxyConfig, ProxyPool, ProxyRotator};
use crate::rate_limit::RateLimiter;
use crate::{Result, SearchError, SearchOptions, SearchQuery, SearchResults};

/// Search client. Cheap to share behind an `Arc`; all mutable state lives in
/// the rate limiter and proxy rotator.
pub struct Search {
    config: SearchConfig,
    fetcher: Arc<dyn PageFetcher>,
    disguise: Disguise,
    rate_limiter: Arc<RateLimiter>,
    rotator: Arc<ProxyRotator>,
    proxy_pool: Option<Arc<ProxyPool>>,
    extractor: Arc<dyn ResultExtractor>,
    classifier: Classifier,
}

impl Search {
    /// Creates a client with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(SearchConfig::default())
    }

    /// Creates a client from `config`.
    pub fn with_config(config: SearchConfig) -> Result<Self> {
        let rate_limiter = match config.rate_limit {
            Some(rate) => RateLimiter::per_second(rate, config.burst)?,
            None => RateLimiter::unlimited(),
        };
        let extractor = DuckDuckGoExtractor::with_selectors(&config.selectors)?;
        let fetcher = HttpFetcher::with_timeout(config.timeout)?;
        let user_agents = RandomUserAgent::new(config.user_agents.clone());
        let classifier = Classifier::new()
            .with_no_results_markers(config.no_results_markers.clone())
            .with_block_markers(config.block_markers.clone());

        Ok(Self {
            fetcher: Arc::new(fetcher),
            disguise: Disguise::new(Arc::new(user_agents)),
            rate_limiter: Arc::new(rate_limiter),
            rotator: Arc::new(ProxyRotator::new()),
            proxy_pool: None,
            extractor: Arc::new(extractor),
            classifier,
            config,
        })
    }

    /// Replaces the page fetcher.
    pub fn set_fetcher<F: PageFetcher + 'static>(&mut self, fetcher: F) {
        self.fetcher = Arc::new(fetcher);
    }

    /// Shares `rate_limiter` with this client. Clients holding the same
    /// limiter draw from one budget.
    pub fn set_rate_limiter(&mut self, rate_limiter: Arc<RateLimiter>) {
        self.rate_limiter = rate_limiter;
    }

    /// Shares `rotator` with this client.
    pub fn set_proxy_rotator(&mut self, rotator: Arc<ProxyRotator>) {
        self.rotator = rotator;
    }

    /// Sets the pool used when a search carries no proxy addresses.
    pub fn set_proxy_pool(&mut self, proxy_pool: ProxyPool) {
        self.proxy_pool = Some(Arc::new(proxy_pool));
    }

    /// Replaces the user-agent source.
    pub fn set_user_agents<U: UserAgentSource + 'static>(&mut self, user_agents: U) {
        self.disguise = Disguise::new(Arc::new(user_agents));
    }

    /// Replaces the result extractor.
    pub fn set_extractor<E: ResultExtractor + 'static>(&mut self, extractor: E) {
        self.extractor = Arc::new(extractor);
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Returns the rate limiter, for sharing with other clients.
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Returns the proxy pool if configured.
    pub fn proxy_pool(&self) -> Option<&Arc<ProxyPool>> {
        self.proxy_pool.as_ref()
    }

    /// Runs one search.
    ///
    /// Returns the results in page order, truncated to `options.limit`. A page
    /// the extractor cannot make sense of yields an empty set; the engine
    /// explicitly reporting no matches yields [`SearchError::NoResults`].
    pub async fn search(
        &self,
        term: &str,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<SearchResults> {
        let start = Instant::now();
        let query = SearchQuery::from_options(term, options)?;

        self.rate_limiter.acquire(cancel).await?;

        let page = query.with_page_size(self.config.page_size(query.limit));
        let url = build_url(&page, &self.config.countries);

        let pooled: Vec<ProxyConfig>;
        let proxies: &[ProxyConfig] = if !query.proxies.is_empty() {
            &query.proxies
        } else if let Some(pool) = &self.proxy_pool {
            pooled = pool.snapshot().await;
            &pooled
        } else {
            &[]
        };
        let proxy = self.rotator.next(proxies);
        debug!(
            "Searching {} via {}",
            url,
            proxy.map_or_else(|| "direct".to_string(), ToString::to_string)
        );

        let request = FetchRequest::new(&url)
            .with_headers(self.disguise.headers())
            .with_proxy(proxy);
        let response = self.fetcher.fetch(request, cancel).await?;

        let body = match self.classifier.classify(response.status, response.body) {
            ClassifiedOutcome::Success(body) => body,
            ClassifiedOutcome::Blocked => {
                warn!("Search for '{}' was blocked (status {})", query.term, response.status);
                return Err(SearchError::Blocked);
            }
            ClassifiedOutcome::NoResults => return Err(SearchError::NoResults),
        };

        let mut results = SearchResults::from(self.extractor.extract(&body));
        let extracted = results.len();
        results.truncate(query.limit);
        results.set_duration(start.elapsed().as_millis() as u64);

        debug!(
            "Search for '{}' kept {} of {} results",
            query.term,
            results.len(),
            extracted
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disguise::FixedUserAgent;
    use crate::endpoint::CountryTable;
    use crate::fetcher::RawResponse;
    use crate::TransportError;
    use async_trait::async_trait;
    use reqwest::header::USER_AGENT;
    use std::sync::Mutex;
    use tokio::time::Duration;

    const RESULTS_PAGE: &str = include_str!("../tests/fixtures/rust_ownership.html");
    const NO_RESULTS_PAGE: &str = include_str!("../tests/fixtures/no_results.html");

    #[derive(Debug, Clone)]
    struct Recorded {
        url: String,
        user_agent: String,
        proxy: Option<u16>,
        at: tokio::time::Instant,
    }

    enum Reply {
        Page(u16, &'static str),
        Timeout,
    }

    struct MockFetcher {
        reply: Reply,
        calls: Arc<Mutex<Vec<Recorded>>>,
    }

    impl MockFetcher {
        fn new(reply: Reply) -> (Self, Arc<Mutex<Vec<Recorded>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let fetcher = Self {
                reply,
                calls: Arc::clone(&calls),
            };
            (fetcher, calls)
        }
    }

    #[async_trait]
    impl PageFetcher for MockFetcher {
        async fn fetch(
            &self,
            request: FetchRequest<'_>,
            cancel: &CancellationToken,
        ) -> Result<RawResponse> {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled.into());
            }
            self.calls.lock().unwrap().push(Recorded {
                url: request.url.to_string(),
                user_agent: request
                    .headers
                    .get(USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string(),
                proxy: request.proxy.map(|p| p.port),
                at: tokio::time::Instant::now(),
            });
            match self.reply {
                Reply::Page(status, body) => Ok(RawResponse::new(status, body)),
                Reply::Timeout => Err(TransportError::Timeout.into()),
            }
        }
    }

    fn search_with(reply: Reply) -> (Search, Arc<Mutex<Vec<Recorded>>>) {
        let (fetcher, calls) = MockFetcher::new(reply);
        let mut search = Search::new().unwrap();
        search.set_fetcher(fetcher);
        search.set_user_agents(FixedUserAgent("test-agent".to_string()));
        (search, calls)
    }

    fn us_english(limit: usize) -> SearchOptions {
        SearchOptions::new()
            .with_country("us")
            .with_language("en")
            .with_limit(limit)
    }

    #[tokio::test]
    async fn test_search_limit_returns_first_results_in_order() {
        let (search, calls) = search_with(Reply::Page(200, RESULTS_PAGE));
        let results = search
            .search("rust ownership", &us_english(5), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 5);
        assert_eq!(results.count, 5);
        assert!(results.items().iter().all(|r| !r.url.is_empty() && r.url != "#"));
        let urls: Vec<_> = results.items().iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://doc.rust-lang.org/book/ch04-01-what-is-ownership.html",
                "https://doc.rust-lang.org/rust-by-example/scope/move.html",
                "https://www.freecodecamp.org/news/rust-ownership-explained/",
                "https://blog.logrocket.com/understanding-ownership-in-rust/",
                "https://stackoverflow.com/questions/tagged/rust-ownership",
            ]
        );

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].url.contains("q=rust+ownership"));
        assert!(calls[0].url.contains("&hl=en"));
        assert!(calls[0].url.ends_with("&num=7"));
        assert!(!calls[0].url.contains("&start="));
        assert_eq!(calls[0].user_agent, "test-agent");
        assert!(calls[0].proxy.is_none());
    }

    #[tokio::test]
    async fn test_search_without_limit_returns_everything() {
        let (search, calls) = search_with(Reply::Page(200, RESULTS_PAGE));
        let results = search
            .search("rust ownership", &SearchOptions::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(results.len(), 8);
        assert!(!calls.lock().unwrap()[0].url.contains("&num="));
    }

    #[tokio::test]
    async fn test_search_start_is_forwarded() {
        let (search, calls) = search_with(Reply::Page(200, RESULTS_PAGE));
        let options = us_english(0).with_start(30);
        search
            .search("rust", &options, &CancellationToken::new())
            .await
            .unwrap();
        assert!(calls.lock().unwrap()[0].url.ends_with("&hl=en&start=30"));
    }

    #[tokio::test]
    async fn test_search_blocked() {
        let (search, _) = search_with(Reply::Page(429, RESULTS_PAGE));
        let result = search
            .search("rust ownership", &us_english(5), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SearchError::Blocked)));
    }

    #[tokio::test]
    async fn test_search_no_results() {
        let (search, _) = search_with(Reply::Page(200, NO_RESULTS_PAGE));
        let result = search
            .search("qwxzvbnm", &us_english(5), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SearchError::NoResults)));
    }

    #[tokio::test]
    async fn test_search_unrecognized_page_is_empty_success() {
        let (search, _) = search_with(Reply::Page(200, "<html><body>maintenance</body></html>"));
        let results = search
            .search("rust", &us_english(5), &CancellationToken::new())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_transport_error() {
        let (search, _) = search_with(Reply::Timeout);
        let result = search
            .search("rust", &us_english(5), &CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(SearchError::Transport(TransportError::Timeout))
        ));
    }

    #[tokio::test]
    async fn test_search_bad_proxy_sends_nothing() {
        let (search, calls) = search_with(Reply::Page(200, RESULTS_PAGE));
        let options = us_english(5).with_proxies(["::not-a-proxy::"]);
        let result = search
            .search("rust", &options, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SearchError::Configuration(_))));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_empty_query() {
        let (search, calls) = search_with(Reply::Page(200, RESULTS_PAGE));
        let result = search
            .search("   ", &us_english(5), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SearchError::Configuration(_))));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_cancelled_before_start() {
        let (search, calls) = search_with(Reply::Page(200, RESULTS_PAGE));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = search.search("rust", &us_english(5), &cancel).await;
        assert!(matches!(result, Err(SearchError::Cancelled)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_rotates_proxies_across_calls() {
        let (search, calls) = search_with(Reply::Page(200, RESULTS_PAGE));
        let options = us_english(5).with_proxies(["http://127.0.0.1:8080", "http://127.0.0.1:8081"]);
        for _ in 0..3 {
            search
                .search("rust", &options, &CancellationToken::new())
                .await
                .unwrap();
        }
        let ports: Vec<_> = calls.lock().unwrap().iter().map(|c| c.proxy).collect();
        assert_eq!(ports, vec![Some(8080), Some(8081), Some(8080)]);
    }

    #[tokio::test]
    async fn test_search_falls_back_to_proxy_pool() {
        let (mut search, calls) = search_with(Reply::Page(200, RESULTS_PAGE));
        search.set_proxy_pool(ProxyPool::with_proxies(vec![ProxyConfig::new("10.0.0.1", 3128)]));
        search
            .search("rust", &us_english(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(calls.lock().unwrap()[0].proxy, Some(3128));
        assert!(search.proxy_pool().is_some());
    }

    #[tokio::test]
    async fn test_search_unknown_country_uses_default_base() {
        let table = CountryTable::single("http://mirror.local/html/?q=");
        let mut search = Search::with_config(SearchConfig::new().with_countries(table)).unwrap();
        let (fetcher, calls) = MockFetcher::new(Reply::Page(200, RESULTS_PAGE));
        search.set_fetcher(fetcher);
        search
            .search("rust", &us_english(0).with_country("ZZ"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            calls.lock().unwrap()[0].url,
            "http://mirror.local/html/?q=rust&hl=en"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_shares_rate_limiter() {
        let limiter = Arc::new(RateLimiter::per_second(2.0, 1).unwrap());
        let (mut first, _) = search_with(Reply::Page(200, RESULTS_PAGE));
        let (mut second, _) = search_with(Reply::Page(200, RESULTS_PAGE));
        first.set_rate_limiter(Arc::clone(&limiter));
        second.set_rate_limiter(Arc::clone(first.rate_limiter()));

        let started = tokio::time::Instant::now();
        let cancel = CancellationToken::new();
        first.search("a", &us_english(1), &cancel).await.unwrap();
        second.search("b", &us_english(1), &cancel).await.unwrap();
        first.search("c", &us_english(1), &cancel).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(990));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_searches_respect_rate() {
        let (mut search, calls) = search_with(Reply::Page(200, RESULTS_PAGE));
        search.set_rate_limiter(Arc::new(RateLimiter::per_second(10.0, 1).unwrap()));
        search.set_proxy_pool(ProxyPool::with_proxies(vec![ProxyConfig::new("10.0.0.1", 3128)]));
        let search = Arc::new(search);
        let cancel = CancellationToken::new();

        let searches = (0..50).map(|i| {
            let search = Arc::clone(&search);
            let cancel = cancel.clone();
            async move {
                search
                    .search(&format!("rust {}", i), &us_english(1), &cancel)
                    .await
            }
        });
        for result in futures::future::join_all(searches).await {
            assert_eq!(result.unwrap().len(), 1);
        }

        let mut times: Vec<_> = calls.lock().unwrap().iter().map(|c| c.at).collect();
        times.sort();
        assert_eq!(times.len(), 50);

        // 10/s with burst 1: any 11 consecutive fetches span at least 1s.
        for window in times.windows(11) {
            let span = window[10].duration_since(window[0]);
            assert!(span >= Duration::from_millis(990), "span was {:?}", span);
        }
        for pair in times.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(98));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_cancelled_while_throttled() {
        let (mut search, calls) = search_with(Reply::Page(200, RESULTS_PAGE));
        search.set_rate_limiter(Arc::new(RateLimiter::per_second(0.1, 1).unwrap()));
        let cancel = CancellationToken::new();
        search.search("a", &us_english(1), &cancel).await.unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let result = search.search("b", &us_english(1), &cancel).await;
        assert!(matches!(result, Err(SearchError::Cancelled)));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_with_config_rejects_bad_rate() {
        let config = SearchConfig::new().with_rate_limit(0.0, 1);
        assert!(matches!(
            Search::with_config(config),
            Err(SearchError::Configuration(_))
        ));
    }

    #[test]
    fn test_search_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Search>();
    }
}
