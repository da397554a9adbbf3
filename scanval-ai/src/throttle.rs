//! Per-adapter API rate limiting
//!
//! Wraps a `governor` direct rate limiter. Adapters without a configured
//! quota get an unthrottled instance.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use tracing::trace;

/// Optional requests-per-second limiter for one adapter
pub struct Throttle {
    limiter: Option<DefaultDirectRateLimiter>,
}

impl Throttle {
    /// Limit to `requests_per_second`; `None` or zero means unlimited
    pub fn per_second(requests_per_second: Option<u32>) -> Self {
        let limiter = requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));
        Self { limiter }
    }

    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait until a request may be sent
    pub async fn ready(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
            trace!("Rate limiter permit acquired");
        }
    }
}
