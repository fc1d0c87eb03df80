//! Result extraction from DuckDuckGo's HTML results page.
//!
//! Everything that depends on the engine's markup lives here. When the page
//! layout changes, adjust [`ExtractorSelectors`] or this module only; callers
//! see the same `extract(body) -> results` contract.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::{Result, SearchError, SearchResult};

const REDIRECT_BASE: &str = "https://duckduckgo.com/";
const REDIRECT_PATH: &str = "/l/";
const REDIRECT_TARGET_PARAM: &str = "uddg";

/// Turns a results page into results.
pub trait ResultExtractor: Send + Sync {
    /// Extracts results in document order. Pages without recognizable result
    /// blocks yield an empty list.
    fn extract(&self, body: &str) -> Vec<SearchResult>;
}

/// CSS selectors describing one result block and its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorSelectors {
    /// One match per hit.
    pub block: String,
    /// Anchor carrying the target URL, relative to the block.
    pub link: String,
    /// Heading holding the title, relative to the block.
    pub title: String,
    /// Snippet text, relative to the block.
    pub snippet: String,
}

impl Default for ExtractorSelectors {
    fn default() -> Self {
        Self {
            block: ".result:not(.result--ad)".to_string(),
            link: "a.result__a".to_string(),
            title: ".result__title".to_string(),
            snippet: ".result__snippet".to_string(),
        }
    }
}

/// Extractor for DuckDuckGo's `html` endpoint.
#[derive(Debug, Clone)]
pub struct DuckDuckGoExtractor {
    block: Selector,
    link: Selector,
    title: Selector,
    snippet: Selector,
}

impl DuckDuckGoExtractor {
    /// Creates an extractor with the default selectors.
    pub fn new() -> Result<Self> {
        Self::with_selectors(&ExtractorSelectors::default())
    }

    /// Creates an extractor with custom selectors.
    pub fn with_selectors(selectors: &ExtractorSelectors) -> Result<Self> {
        Ok(Self {
            block: parse_selector(&selectors.block)?,
            link: parse_selector(&selectors.link)?,
            title: parse_selector(&selectors.title)?,
            snippet: parse_selector(&selectors.snippet)?,
        })
    }

    fn parse_block(&self, block: ElementRef<'_>) -> Option<SearchResult> {
        let href = block
            .select(&self.link)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
            .map(str::trim)
            .unwrap_or_default();

        if href.is_empty() || href == "#" {
            return None;
        }

        let url = resolve_redirect(href).unwrap_or_else(|| href.to_string());
        if url.is_empty() || url == "#" {
            return None;
        }

        let title = block
            .select(&self.title)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let description = block
            .select(&self.snippet)
            .next()
            .map(element_text)
            .unwrap_or_default();

        Some(SearchResult::new(url, title, description))
    }
}

impl ResultExtractor for DuckDuckGoExtractor {
    fn extract(&self, body: &str) -> Vec<SearchResult> {
        let document = Html::parse_document(body);
        let mut blocks = 0usize;

        let results: Vec<SearchResult> = document
            .select(&self.block)
            .inspect(|_| blocks += 1)
            .filter_map(|block| self.parse_block(block))
            .collect();

        debug!("Extracted {} results from {} blocks", results.len(), blocks);
        results
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| {
        SearchError::Configuration(format!("Invalid selector '{}': {:?}", css, e))
    })
}

/// Concatenates an element's text with runs of whitespace collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Unwraps DuckDuckGo's click-tracking links (`//duckduckgo.com/l/?uddg=...`)
/// to their destination. Returns `None` for anything else.
fn resolve_redirect(href: &str) -> Option<String> {
    let base = Url::parse(REDIRECT_BASE).ok()?;
    let url = base.join(href).ok()?;

    let is_ddg = url
        .host_str()
        .is_some_and(|host| host == "duckduckgo.com" || host.ends_with(".duckduckgo.com"));
    if !is_ddg || !url.path().starts_with(REDIRECT_PATH) {
        return None;
    }

    url.query_pairs()
        .find(|(key, _)| key == REDIRECT_TARGET_PARAM)
        .map(|(_, target)| target.trim().to_string())
}
