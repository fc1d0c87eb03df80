//! Search options and the normalized query built from them.

use serde::{Deserialize, Serialize};

use crate::proxy::ProxyConfig;
use crate::{Result, SearchError};

/// Country used when none is given.
pub const DEFAULT_COUNTRY: &str = "us";

/// Language used when none is given.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Per-call options supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// ISO two-letter country code, case-insensitive.
    pub country_code: String,
    /// Interface language (e.g., "en").
    pub language_code: String,
    /// Maximum number of results; 0 means no limit.
    pub limit: usize,
    /// Pagination offset.
    pub start: usize,
    /// Proxy URIs to rotate through for this search.
    pub proxy_addresses: Vec<String>,
}

impl SearchOptions {
    /// Creates options with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the country code.
    pub fn with_country(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    /// Sets the language code.
    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = language_code.into();
        self
    }

    /// Sets the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the pagination offset.
    pub fn with_start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    /// Sets the proxy addresses.
    pub fn with_proxies<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.proxy_addresses = addresses.into_iter().map(Into::into).collect();
        self
    }
}

/// A normalized, validated query ready for URL construction.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// The search terms as given by the caller.
    pub term: String,
    /// Lowercased country code.
    pub country_code: String,
    /// Language code, never empty.
    pub language_code: String,
    /// Maximum number of results; 0 means no limit.
    pub limit: usize,
    /// Pagination offset.
    pub start: usize,
    /// Parsed proxy pool for this search.
    pub proxies: Vec<ProxyConfig>,
}

impl SearchQuery {
    /// Creates a query with default options.
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            country_code: DEFAULT_COUNTRY.to_string(),
            language_code: DEFAULT_LANGUAGE.to_string(),
            limit: 0,
            start: 0,
            proxies: Vec::new(),
        }
    }

    /// Normalizes caller options into a query.
    ///
    /// Fails with [`SearchError::Configuration`] on an empty term or a
    /// malformed proxy address, before anything is sent.
    pub fn from_options(term: &str, options: &SearchOptions) -> Result<Self> {
        if term.trim().is_empty() {
            return Err(SearchError::Configuration(
                "Query cannot be empty".to_string(),
            ));
        }

        let country_code = match options.country_code.trim() {
            "" => DEFAULT_COUNTRY.to_string(),
            code => code.to_lowercase(),
        };
        let language_code = match options.language_code.trim() {
            "" => DEFAULT_LANGUAGE.to_string(),
            code => code.to_string(),
        };
        let proxies = options
            .proxy_addresses
            .iter()
            .map(|address| ProxyConfig::parse(address))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            term: term.to_string(),
            country_code,
            language_code,
            limit: options.limit,
            start: options.start,
            proxies,
        })
    }

    /// Returns a copy with the page size replaced, leaving the caller's
    /// limit untouched everywhere else.
    pub(crate) fn with_page_size(&self, page_size: usize) -> Self {
        Self {
            limit: page_size,
            ..self.clone()
        }
    }
}
