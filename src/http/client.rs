//! HTTP client with retry, rate limiting and response caching
//!
//! Every GET goes through the same pipeline:
//! - rate limiter (one token per logical request, including cache hits)
//! - cache lookup keyed on URL plus sorted query parameters
//! - attempt loop driven by the [`RetryPolicy`]
//! - successful responses stored in the cache
//!
//! Timeouts and connection failures end the request immediately; only
//! status errors listed in the policy are retried.

use super::cache::{build_cache_key, ResponseCache};
use super::rate_limit::RateLimiter;
use super::retry::RetryPolicy;
use crate::error::{Error, Result};
use crate::types::{QueryParams, StringMap};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default size of the connection pool
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;

/// Configuration for the HTTP client
#[derive(Clone)]
pub struct HttpClientConfig {
    /// Request timeout, overridable per request
    pub timeout: Duration,
    /// Maximum pooled connections per host
    pub max_connections: usize,
    /// Headers sent with every request
    pub default_headers: StringMap,
    /// User agent string
    pub user_agent: String,
    /// Retry policy; `None` disables retries
    pub retry: Option<RetryPolicy>,
    /// Rate limiter, possibly shared with other clients
    pub rate_limiter: Option<Arc<RateLimiter>>,
    /// Response cache, possibly shared with other clients
    pub cache: Option<Arc<ResponseCache>>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            default_headers: StringMap::new(),
            user_agent: format!("marketschema/{}", env!("CARGO_PKG_VERSION")),
            retry: None,
            rate_limiter: None,
            cache: None,
        }
    }
}

impl std::fmt::Debug for HttpClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientConfig")
            .field("timeout", &self.timeout)
            .field("max_connections", &self.max_connections)
            .field("default_headers", &self.default_headers)
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .field("rate_limiter", &self.rate_limiter)
            .field("has_cache", &self.cache.is_some())
            .finish()
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::config("timeout", "must be greater than 0"));
        }
        if self.max_connections == 0 {
            return Err(Error::config("max_connections", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection pool size
    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.config.max_connections = max_connections;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Enable retries
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = Some(policy);
        self
    }

    /// Attach a rate limiter
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.config.rate_limiter = Some(limiter);
        self
    }

    /// Attach a response cache
    pub fn cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.config.cache = Some(cache);
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters, sent in insertion order
    pub query: QueryParams,
    /// Request headers, overriding the client defaults
    pub headers: StringMap,
    /// Override timeout for this request
    pub timeout: Option<Duration>,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Fully read HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Final URL after redirects
    pub url: String,
}

impl HttpResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            Error::http(
                Some(self.url.clone()),
                format!("invalid JSON response: {e}"),
                e,
            )
        })
    }

    /// Header value, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Async HTTP client with a lazily created connection pool
pub struct HttpClient {
    config: HttpClientConfig,
    default_headers: HeaderMap,
    pool: Mutex<Option<Client>>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
            default_headers: HeaderMap::new(),
            pool: Mutex::new(None),
        }
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        config.validate()?;
        let default_headers = to_header_map(&config.default_headers)
            .map_err(|e| Error::config("default_headers", e.to_string()))?;

        Ok(Self {
            config,
            default_headers,
            pool: Mutex::new(None),
        })
    }

    /// Client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Whether the connection pool is currently allocated
    pub async fn is_open(&self) -> bool {
        self.pool.lock().await.is_some()
    }

    /// Release the connection pool. The next request re-creates it.
    pub async fn close(&self) {
        if self.pool.lock().await.take().is_some() {
            debug!("HTTP connection pool closed");
        }
    }

    /// Run `f` with this client, then close the pool.
    ///
    /// The pool is released when `f` completes, panics, or the returned
    /// future is dropped before completion.
    pub async fn scoped<'a, F, Fut, T>(&'a self, f: F) -> T
    where
        F: FnOnce(&'a Self) -> Fut,
        Fut: Future<Output = T> + 'a,
    {
        let _guard = PoolGuard { pool: &self.pool };
        f(self).await
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.get_with_config(url, RequestConfig::default()).await
    }

    /// Make a GET request with config
    pub async fn get_with_config(&self, url: &str, config: RequestConfig) -> Result<HttpResponse> {
        if let Some(ref limiter) = self.config.rate_limiter {
            limiter.acquire().await;
        }

        let cache_key = self
            .config
            .cache
            .as_ref()
            .map(|cache| (cache, build_cache_key(url, &config.query)));

        if let Some((cache, ref key)) = cache_key {
            if let Some(hit) = cache.get(key).await {
                debug!(url, "Cache hit");
                return Ok(hit);
            }
            debug!(url, "Cache miss");
        }

        let response = self.execute(url, &config).await?;

        if let Some((cache, key)) = cache_key {
            if response.is_success() {
                cache.set(key, response.clone()).await;
            }
        }

        Ok(response)
    }

    /// Make a GET request and parse JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.get_json_with_config(url, RequestConfig::default())
            .await
    }

    /// Make a GET request with config and parse JSON response
    pub async fn get_json_with_config<T: DeserializeOwned>(
        &self,
        url: &str,
        config: RequestConfig,
    ) -> Result<T> {
        self.get_with_config(url, config).await?.json()
    }

    /// Make a GET request and return the body as text
    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.get_text_with_config(url, RequestConfig::default())
            .await
    }

    /// Make a GET request with config and return the body as text
    pub async fn get_text_with_config(&self, url: &str, config: RequestConfig) -> Result<String> {
        Ok(self.get_with_config(url, config).await?.text())
    }

    /// Shared pool handle, created on first use
    async fn pooled(&self) -> Result<Client> {
        let mut pool = self.pool.lock().await;
        if let Some(ref client) = *pool {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .pool_max_idle_per_host(self.config.max_connections)
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| Error::http(None, "failed to build HTTP client", e))?;
        debug!(
            max_connections = self.config.max_connections,
            "HTTP connection pool created"
        );

        *pool = Some(client.clone());
        Ok(client)
    }

    /// Attempt loop
    async fn execute(&self, url: &str, config: &RequestConfig) -> Result<HttpResponse> {
        let client = self.pooled().await?;
        let timeout = config.timeout.unwrap_or(self.config.timeout);

        let mut headers = self.default_headers.clone();
        for (name, value) in to_header_map(&config.headers)? {
            if let Some(name) = name {
                headers.insert(name, value);
            }
        }

        let mut attempt = 0;
        loop {
            let mut req = client.get(url).headers(headers.clone()).timeout(timeout);
            if !config.query.is_empty() {
                req = req.query(&config.query);
            }

            let response = req
                .send()
                .await
                .map_err(|e| classify_error(url, timeout, e))?;
            let status = response.status();

            if status.is_success() {
                debug!(url, status = status.as_u16(), attempt, "Request succeeded");
                return read_response(url, timeout, response).await;
            }

            let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
                parse_retry_after(response.headers())
            } else {
                None
            };
            let body = response
                .text()
                .await
                .ok()
                .filter(|body| !body.is_empty());
            let error = status_error(url, status, body, retry_after);

            let Some(ref policy) = self.config.retry else {
                return Err(error);
            };

            if !policy.should_retry(status.as_u16(), attempt) {
                if attempt > 0 {
                    warn!(
                        url,
                        status = status.as_u16(),
                        attempts = attempt + 1,
                        "Giving up after retries"
                    );
                }
                return Err(error);
            }

            let mut delay = policy.get_delay(attempt);
            if let Some(hint) = retry_after {
                delay = delay.max(hint);
            }
            warn!(
                url,
                status = status.as_u16(),
                attempt = attempt + 1,
                max_retries = policy.max_retries(),
                delay_ms = delay.as_millis() as u64,
                "Request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Releases the pool when dropped
struct PoolGuard<'a> {
    pool: &'a Mutex<Option<Client>>,
}

impl Drop for PoolGuard<'_> {
    fn drop(&mut self) {
        // Contended only when the client is also used outside the scope
        match self.pool.try_lock() {
            Ok(mut pool) => {
                if pool.take().is_some() {
                    debug!("HTTP connection pool closed");
                }
            }
            Err(_) => warn!("HTTP connection pool busy, left open at end of scope"),
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn to_header_map(headers: &StringMap) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| Error::http(None, format!("invalid header name '{key}'"), e))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::http(None, format!("invalid value for header '{key}'"), e))?;
        map.insert(name, value);
    }
    Ok(map)
}

async fn read_response(
    url: &str,
    timeout: Duration,
    response: reqwest::Response,
) -> Result<HttpResponse> {
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let final_url = response.url().to_string();
    let body = response
        .bytes()
        .await
        .map_err(|e| classify_error(url, timeout, e))?;

    Ok(HttpResponse {
        status,
        headers,
        body,
        url: final_url,
    })
}

/// Map a transport error onto the error taxonomy
fn classify_error(url: &str, timeout: Duration, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
            source: Some(e),
        }
    } else if e.is_connect() {
        Error::Connection {
            url: url.to_string(),
            message: e.to_string(),
            source: Some(e),
        }
    } else {
        Error::http(Some(url.to_string()), e.to_string(), e)
    }
}

fn status_error(
    url: &str,
    status: StatusCode,
    body: Option<String>,
    retry_after: Option<Duration>,
) -> Error {
    if status == StatusCode::TOO_MANY_REQUESTS {
        Error::RateLimited {
            url: url.to_string(),
            body,
            retry_after,
        }
    } else {
        Error::http_status(url, status.as_u16(), body)
    }
}

/// Retry-After in whole seconds; HTTP-date values are ignored
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?;
    let parsed = value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok());

    if parsed.is_none() {
        warn!(value = ?value, "Ignoring unparseable Retry-After header");
    }
    parsed.map(Duration::from_secs)
}
