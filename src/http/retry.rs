//! Retry policy with exponential backoff and jitter

use crate::error::{Error, Result};
use rand::Rng;
use std::collections::BTreeSet;
use std::time::Duration;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base delay in seconds
pub const DEFAULT_BACKOFF_FACTOR: f64 = 0.5;
/// Default relative jitter
pub const DEFAULT_JITTER: f64 = 0.1;
/// Statuses retried unless configured otherwise
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Decides whether a failed request is retried and how long to wait.
///
/// Attempts are 0-indexed: attempt 0 is the first request. With
/// `max_retries = 3` a request is tried at most four times.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_factor: f64,
    retry_statuses: BTreeSet<u16>,
    jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            retry_statuses: DEFAULT_RETRY_STATUSES.into_iter().collect(),
            jitter: DEFAULT_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Create a validated retry policy
    pub fn new(
        max_retries: u32,
        backoff_factor: f64,
        retry_statuses: impl IntoIterator<Item = u16>,
        jitter: f64,
    ) -> Result<Self> {
        if !backoff_factor.is_finite() || backoff_factor <= 0.0 {
            return Err(Error::config(
                "backoff_factor",
                format!("must be a positive number, got {backoff_factor}"),
            ));
        }
        if !(0.0..=1.0).contains(&jitter) {
            return Err(Error::config(
                "jitter",
                format!("must be between 0.0 and 1.0, got {jitter}"),
            ));
        }

        Ok(Self {
            max_retries,
            backoff_factor,
            retry_statuses: retry_statuses.into_iter().collect(),
            jitter,
        })
    }

    /// Start building a policy from the defaults
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    pub fn retry_statuses(&self) -> &BTreeSet<u16> {
        &self.retry_statuses
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Whether a response with `status` on `attempt` should be retried
    pub fn should_retry(&self, status: u16, attempt: u32) -> bool {
        attempt < self.max_retries && self.retry_statuses.contains(&status)
    }

    /// Backoff before the retry that follows `attempt`.
    ///
    /// `backoff_factor * 2^attempt`, scaled by a uniform factor in
    /// `[1 - jitter, 1 + jitter]`.
    pub fn get_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let mut secs = self.backoff_factor * 2f64.powi(exponent);

        if self.jitter > 0.0 {
            let factor = rand::thread_rng().gen_range(-self.jitter..=self.jitter);
            secs *= 1.0 + factor;
        }

        Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// Builder for [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_retries: u32,
    backoff_factor: f64,
    retry_statuses: Vec<u16>,
    jitter: f64,
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
            jitter: DEFAULT_JITTER,
        }
    }
}

impl RetryPolicyBuilder {
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Base delay in seconds
    #[must_use]
    pub fn backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor;
        self
    }

    #[must_use]
    pub fn retry_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retry_statuses = statuses.into_iter().collect();
        self
    }

    #[must_use]
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Validate and build the policy
    pub fn build(self) -> Result<RetryPolicy> {
        RetryPolicy::new(
            self.max_retries,
            self.backoff_factor,
            self.retry_statuses,
            self.jitter,
        )
    }
}
