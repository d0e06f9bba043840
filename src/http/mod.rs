//! HTTP client module
//!
//! Provides the HTTP access layer shared by all adapters.
//!
//! # Features
//!
//! - **Connection Pooling**: One lazily created pool per client, released by `close()`
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Automatic Retries**: Exponential backoff with jitter for retryable statuses
//! - **Response Caching**: LRU cache with per-entry TTL for successful responses

mod cache;
mod client;
mod rate_limit;
mod retry;

pub use cache::{build_cache_key, ResponseCache, DEFAULT_CACHE_SIZE, DEFAULT_CACHE_TTL};
pub use client::{
    HttpClient, HttpClientConfig, HttpClientConfigBuilder, HttpResponse, RequestConfig,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_TIMEOUT,
};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use retry::{
    RetryPolicy, RetryPolicyBuilder, DEFAULT_BACKOFF_FACTOR, DEFAULT_JITTER, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_STATUSES,
};

#[cfg(test)]
mod tests;
