//! Client configuration.

use std::time::Duration;

use crate::classify::NO_RESULTS_MARKER;
use crate::disguise::DEFAULT_USER_AGENTS;
use crate::endpoint::CountryTable;
use crate::extract::ExtractorSelectors;
use crate::fetcher_http::DEFAULT_TIMEOUT;

/// Page-size multiplier applied when a limit is requested.
pub const DEFAULT_OVERFETCH_FACTOR: f64 = 1.5;

/// Settings used by [`Search::with_config`](crate::Search::with_config).
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Requests per second across all searches; `None` disables throttling.
    pub rate_limit: Option<f64>,
    /// Requests allowed back to back before the rate applies.
    pub burst: u32,
    /// Multiplier for the requested page size, making up for blocks the
    /// extractor drops. A heuristic, not a guarantee.
    pub overfetch_factor: f64,
    /// User agents to rotate through.
    pub user_agents: Vec<String>,
    /// Country code to base URL mapping.
    pub countries: CountryTable,
    /// Selectors for the result extractor.
    pub selectors: ExtractorSelectors,
    /// Body phrases meaning "nothing matched".
    pub no_results_markers: Vec<String>,
    /// Body phrases meaning the engine served a challenge page.
    pub block_markers: Vec<String>,
}

impl SearchConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Throttles to `rate` requests per second with bursts of `burst`.
    pub fn with_rate_limit(mut self, rate: f64, burst: u32) -> Self {
        self.rate_limit = Some(rate);
        self.burst = burst;
        self
    }

    /// Sets the over-fetch multiplier.
    pub fn with_overfetch_factor(mut self, factor: f64) -> Self {
        self.overfetch_factor = factor;
        self
    }

    /// Replaces the user-agent pool.
    pub fn with_user_agents(mut self, user_agents: Vec<String>) -> Self {
        self.user_agents = user_agents;
        self
    }

    /// Replaces the country table.
    pub fn with_countries(mut self, countries: CountryTable) -> Self {
        self.countries = countries;
        self
    }

    /// Replaces the extractor selectors.
    pub fn with_selectors(mut self, selectors: ExtractorSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Replaces the no-results markers.
    pub fn with_no_results_markers(mut self, markers: Vec<String>) -> Self {
        self.no_results_markers = markers;
        self
    }

    /// Replaces the block markers.
    pub fn with_block_markers(mut self, markers: Vec<String>) -> Self {
        self.block_markers = markers;
        self
    }

    /// Page size to request for a caller limit. 0 stays 0 (no `num` parameter).
    pub fn page_size(&self, limit: usize) -> usize {
        if limit == 0 {
            return 0;
        }
        let factor = if self.overfetch_factor.is_finite() && self.overfetch_factor >= 1.0 {
            self.overfetch_factor
        } else {
            1.0
        };
        ((limit as f64) * factor).floor() as usize
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            rate_limit: None,
            burst: 1,
            overfetch_factor: DEFAULT_OVERFETCH_FACTOR,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
            countries: CountryTable::default(),
            selectors: ExtractorSelectors::default(),
            no_results_markers: vec![NO_RESULTS_MARKER.to_string()],
            block_markers: Vec::new(),
        }
    }
}
