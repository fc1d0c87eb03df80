//! Browser-like request headers and user-agent rotation.

use std::sync::Arc;

use rand::seq::SliceRandom;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, COOKIE,
    USER_AGENT,
};
use tracing::warn;

/// User agents rotated through by default.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.51",
];

/// Supplies the user agent for the next request.
pub trait UserAgentSource: Send + Sync {
    /// Returns a user-agent string.
    fn pick(&self) -> String;
}

/// Picks uniformly at random from a pool on every call.
#[derive(Debug, Clone)]
pub struct RandomUserAgent {
    pool: Vec<String>,
}

impl RandomUserAgent {
    /// Creates a picker over the given pool. An empty pool falls back to
    /// [`DEFAULT_USER_AGENTS`].
    pub fn new(pool: Vec<String>) -> Self {
        if pool.is_empty() {
            return Self::default();
        }
        Self { pool }
    }

    /// Returns the pool size.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Returns whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

impl Default for RandomUserAgent {
    fn default() -> Self {
        Self {
            pool: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
        }
    }
}

impl UserAgentSource for RandomUserAgent {
    fn pick(&self) -> String {
        self.pool
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_AGENTS[0].to_string())
    }
}

/// Always returns the same user agent.
#[derive(Debug, Clone)]
pub struct FixedUserAgent(pub String);

impl UserAgentSource for FixedUserAgent {
    fn pick(&self) -> String {
        self.0.clone()
    }
}

/// Builds the header set attached to every outbound request.
#[derive(Clone)]
pub struct Disguise {
    user_agents: Arc<dyn UserAgentSource>,
}

impl Disguise {
    /// Creates a provider backed by the given user-agent source.
    pub fn new(user_agents: Arc<dyn UserAgentSource>) -> Self {
        Self { user_agents }
    }

    /// Returns the baseline headers plus a freshly picked user agent.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        headers.insert(COOKIE, HeaderValue::from_static("CONSENT=YES+"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let agent = self.user_agents.pick();
        match HeaderValue::from_str(&agent) {
            Ok(value) => {
                headers.insert(USER_AGENT, value);
            }
            Err(_) => {
                warn!("Skipping user agent with invalid header characters");
                headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENTS[0]));
            }
        }

        headers
    }
}

impl Default for Disguise {
    fn default() -> Self {
        Self::new(Arc::new(RandomUserAgent::default()))
    }
}
