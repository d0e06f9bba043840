//! Rate limiting implementation
//!
//! Token bucket rate limiting on top of the governor crate. Governor's GCRA
//! accrues permits continuously (fractional credit carries over between
//! calls) and updates its state with a single atomic compare-and-swap, so
//! concurrent `acquire` callers can never be granted the same token.

use crate::error::{Error, Result};
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Sustained request rate
    pub requests_per_second: f64,
    /// Burst size (max tokens in bucket), defaults to `floor(requests_per_second)`
    #[serde(default)]
    pub burst_size: Option<u32>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10.0,
            burst_size: None,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(requests_per_second: f64, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size: Some(burst_size),
        }
    }

    /// Config with the burst size derived from the rate
    pub fn per_second(requests_per_second: f64) -> Self {
        Self {
            requests_per_second,
            burst_size: None,
        }
    }
}

/// Token bucket rate limiter
///
/// Share one instance between clients with `Arc` to apply a common budget.
pub struct RateLimiter {
    limiter: Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>,
    requests_per_second: f64,
    burst_size: u32,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// `burst_size` defaults to `floor(requests_per_second)`.
    pub fn new(requests_per_second: f64, burst_size: Option<u32>) -> Result<Self> {
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            return Err(Error::config(
                "requests_per_second",
                format!("must be a positive number, got {requests_per_second}"),
            ));
        }

        let burst = burst_size.unwrap_or(requests_per_second.floor() as u32);
        let burst = NonZeroU32::new(burst).ok_or_else(|| {
            Error::config(
                "burst_size",
                format!("must be at least 1 (requests_per_second = {requests_per_second})"),
            )
        })?;

        let period = Duration::try_from_secs_f64(1.0 / requests_per_second).map_err(|e| {
            Error::config(
                "requests_per_second",
                format!("{requests_per_second} is too low to schedule: {e}"),
            )
        })?;
        let quota = Quota::with_period(period)
            .ok_or_else(|| {
                Error::config(
                    "requests_per_second",
                    format!("{requests_per_second} is too high to schedule"),
                )
            })?
            .allow_burst(burst);

        Ok(Self {
            limiter: Governor::direct(quota),
            requests_per_second,
            burst_size: burst.get(),
        })
    }

    /// Create a rate limiter from a config
    pub fn from_config(config: &RateLimiterConfig) -> Result<Self> {
        Self::new(config.requests_per_second, config.burst_size)
    }

    /// Configured sustained rate
    pub fn requests_per_second(&self) -> f64 {
        self.requests_per_second
    }

    /// Bucket capacity
    pub fn burst_size(&self) -> u32 {
        self.burst_size
    }

    /// Wait until a token is available, then consume it
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to consume a token, returning immediately
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Wait for a token, giving up after `timeout`
    pub async fn acquire_with_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.limiter.until_ready())
            .await
            .is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .field("burst_size", &self.burst_size)
            .finish_non_exhaustive()
    }
}
