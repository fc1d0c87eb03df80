//! Token-bucket rate limiter shared by every search that holds it.

use std::sync::Mutex;

use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{Result, SearchError};

/// Token-bucket state. Tokens may go negative: each caller reserves the next
/// free slot and sleeps until it comes due.
#[derive(Debug)]
struct Bucket {
    rate: f64,
    burst: f64,
    tokens: f64,
    last: Instant,
}

impl Bucket {
    fn reserve(&mut self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.burst);
        self.last = now;
        self.tokens -= 1.0;

        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            // Very slow rates push the slot past what a Duration can hold.
            Duration::try_from_secs_f64(-self.tokens / self.rate).unwrap_or(Duration::MAX)
        }
    }
}

/// Bounds the rate of outbound requests.
///
/// The default limiter never waits. Share one instance through an `Arc` to
/// apply a single budget across concurrent searches. Slots reserved by a
/// cancelled caller are not handed back, so the configured rate holds even
/// under cancellation.
#[derive(Debug, Default)]
pub struct RateLimiter {
    bucket: Option<Mutex<Bucket>>,
}

impl RateLimiter {
    /// Creates a limiter that never throttles.
    pub fn unlimited() -> Self {
        Self { bucket: None }
    }

    /// Creates a limiter allowing `rate` requests per second with bursts of
    /// up to `burst` requests.
    pub fn per_second(rate: f64, burst: u32) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(SearchError::Configuration(format!(
                "Rate limit must be a positive number of requests per second, got {}",
                rate
            )));
        }
        if burst == 0 {
            return Err(SearchError::Configuration(
                "Rate limit burst must be at least 1".to_string(),
            ));
        }

        let burst = f64::from(burst);
        Ok(Self {
            bucket: Some(Mutex::new(Bucket {
                rate,
                burst,
                tokens: burst,
                last: Instant::now(),
            })),
        })
    }

    /// Returns whether this limiter ever waits.
    pub fn is_limited(&self) -> bool {
        self.bucket.is_some()
    }

    /// Waits for a token.
    ///
    /// Returns [`SearchError::Cancelled`] as soon as `cancel` fires.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let Some(bucket) = &self.bucket else {
            return Ok(());
        };

        let wait = bucket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .reserve(Instant::now());

        if wait.is_zero() {
            return Ok(());
        }

        debug!("Rate limiter delaying request by {:?}", wait);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SearchError::Cancelled),
            _ = sleep(wait) => Ok(()),
        }
    }
}
