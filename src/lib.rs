//! # duckscrape
//!
//! A search client for DuckDuckGo's HTML results page.
//!
//! The engine offers no public API and pushes back against automated clients,
//! so this crate takes care of:
//!
//! - Building regional results URLs with paging parameters
//! - Browser-like headers and user-agent rotation
//! - A shared token-bucket rate limiter
//! - Round-robin proxy rotation
//! - Extracting results from the page markup
//! - Telling apart blocked, empty and failed searches
//!
//! ## Example
//!
//! ```rust,no_run
//! use duckscrape::{Search, SearchError, SearchOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let search = Search::new()?;
//!     let options = SearchOptions::new().with_country("us").with_limit(5);
//!
//!     match search.search("rust ownership", &options, &CancellationToken::new()).await {
//!         Ok(results) => {
//!             for result in results.items() {
//!                 println!("{}: {}", result.title, result.url);
//!             }
//!         }
//!         Err(SearchError::Blocked) => eprintln!("blocked, back off and retry later"),
//!         Err(e) => return Err(e.into()),
//!     }
//!     Ok(())
//! }
//! ```

mod classify;
mod config;
mod error;
mod query;
mod result;
mod search;

pub mod disguise;
pub mod endpoint;
pub mod extract;
pub mod fetcher;
pub mod fetcher_http;
pub mod proxy;
pub mod rate_limit;

pub use classify::{ClassifiedOutcome, Classifier, NO_RESULTS_MARKER};
pub use config::{SearchConfig, DEFAULT_OVERFETCH_FACTOR};
pub use error::{Result, SearchError, TransportError};
pub use fetcher::{FetchRequest, PageFetcher, RawResponse};
pub use fetcher_http::HttpFetcher;
pub use query::{SearchOptions, SearchQuery};
pub use rate_limit::RateLimiter;
pub use result::{SearchResult, SearchResults};
pub use search::Search;
