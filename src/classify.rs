//! Response classification: results, block, or an explicit no-match page.

use tracing::debug;

/// HTTP status the engine answers with when it throttles a client.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Phrase the engine prints when nothing matched the query.
pub const NO_RESULTS_MARKER: &str = "did not match any documents";

/// What a response turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedOutcome {
    /// A results page, to be handed to the extractor.
    Success(String),
    /// The engine refused to serve this client.
    Blocked,
    /// The engine stated that nothing matched.
    NoResults,
}

/// Classifies responses by status code and body markers.
#[derive(Debug, Clone)]
pub struct Classifier {
    no_results_markers: Vec<String>,
    block_markers: Vec<String>,
}

impl Classifier {
    /// Creates a classifier with the default no-results marker and no block
    /// markers.
    pub fn new() -> Self {
        Self {
            no_results_markers: vec![NO_RESULTS_MARKER.to_string()],
            block_markers: Vec::new(),
        }
    }

    /// Replaces the no-results markers.
    pub fn with_no_results_markers(mut self, markers: Vec<String>) -> Self {
        self.no_results_markers = markers;
        self
    }

    /// Replaces the block markers. A body containing any of them is treated
    /// like a 429, which lets callers recognise challenge pages.
    pub fn with_block_markers(mut self, markers: Vec<String>) -> Self {
        self.block_markers = markers;
        self
    }

    /// Classifies a response. A 429 always wins over the body.
    pub fn classify(&self, status: u16, body: String) -> ClassifiedOutcome {
        let outcome = if status == STATUS_TOO_MANY_REQUESTS || contains_any(&body, &self.block_markers)
        {
            ClassifiedOutcome::Blocked
        } else if contains_any(&body, &self.no_results_markers) {
            ClassifiedOutcome::NoResults
        } else {
            ClassifiedOutcome::Success(body)
        };

        debug!(
            "Classified {} response as {}",
            status,
            match &outcome {
                ClassifiedOutcome::Success(_) => "success",
                ClassifiedOutcome::Blocked => "blocked",
                ClassifiedOutcome::NoResults => "no results",
            }
        );
        outcome
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_any(body: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|marker| !marker.is_empty() && body.contains(marker.as_str()))
}
