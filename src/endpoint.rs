//! Results-page URL construction.

use std::collections::HashMap;

use crate::query::{SearchQuery, DEFAULT_COUNTRY};

const HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const FALLBACK_BASE: &str = "https://html.duckduckgo.com/html/?q=";

/// DuckDuckGo `kl` region for each supported country code.
const REGIONS: &[(&str, &str)] = &[
    ("us", "us-en"),
    ("uk", "uk-en"),
    ("gb", "uk-en"),
    ("ie", "ie-en"),
    ("ca", "ca-en"),
    ("au", "au-en"),
    ("nz", "nz-en"),
    ("in", "in-en"),
    ("de", "de-de"),
    ("at", "at-de"),
    ("ch", "ch-de"),
    ("fr", "fr-fr"),
    ("be", "be-fr"),
    ("es", "es-es"),
    ("mx", "mx-es"),
    ("it", "it-it"),
    ("nl", "nl-nl"),
    ("se", "se-sv"),
    ("pl", "pl-pl"),
    ("br", "br-pt"),
    ("ru", "ru-ru"),
    ("jp", "jp-jp"),
    ("kr", "kr-kr"),
    ("cn", "cn-zh"),
];

/// Maps country codes to the base URL a query term is appended to.
///
/// Base URLs end where the encoded term begins (`...&q=`). Lookups are
/// case-insensitive and unknown codes resolve to the default entry.
#[derive(Debug, Clone)]
pub struct CountryTable {
    bases: HashMap<String, String>,
    default_code: String,
}

impl CountryTable {
    /// Creates a table holding only a default entry.
    pub fn single(base: impl Into<String>) -> Self {
        let mut bases = HashMap::new();
        bases.insert(DEFAULT_COUNTRY.to_string(), base.into());
        Self {
            bases,
            default_code: DEFAULT_COUNTRY.to_string(),
        }
    }

    /// Adds or replaces the base URL for a country.
    pub fn with_country(mut self, code: &str, base: impl Into<String>) -> Self {
        self.bases.insert(code.to_lowercase(), base.into());
        self
    }

    /// Returns the base URL for `code`, falling back to the default entry.
    pub fn base_for(&self, code: &str) -> &str {
        self.bases
            .get(&code.to_lowercase())
            .or_else(|| self.bases.get(&self.default_code))
            .map(String::as_str)
            .unwrap_or(FALLBACK_BASE)
    }

    /// Returns the number of mapped countries.
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// Returns whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

impl Default for CountryTable {
    fn default() -> Self {
        let bases = REGIONS
            .iter()
            .map(|(code, region)| {
                (code.to_string(), format!("{}?kl={}&q=", HTML_ENDPOINT, region))
            })
            .collect();
        Self {
            bases,
            default_code: DEFAULT_COUNTRY.to_string(),
        }
    }
}

/// Trims the term and joins its space-separated words with `+`, percent-encoding
/// everything else.
pub fn encode_term(term: &str) -> String {
    term.trim()
        .split(' ')
        .map(|word| urlencoding::encode(word).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

/// Builds the results-page URL for a query.
pub fn build_url(query: &SearchQuery, table: &CountryTable) -> String {
    let mut url = format!(
        "{}{}&hl={}",
        table.base_for(&query.country_code),
        encode_term(&query.term),
        urlencoding::encode(&query.language_code)
    );

    if query.start != 0 {
        url.push_str(&format!("&start={}", query.start));
    }
    if query.limit != 0 {
        url.push_str(&format!("&num={}", query.limit));
    }

    url
}
