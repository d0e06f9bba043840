//! Client settings loaded from YAML or JSON
//!
//! Settings files describe how the shared [`HttpClient`] is built: timeouts,
//! pool size, default headers and the optional retry, rate limit and cache
//! layers. Omitted fields fall back to the library defaults.
//!
//! ```yaml
//! timeout_seconds: 10
//! headers:
//!   Accept: application/json
//! retry:
//!   max_retries: 5
//! rate_limit:
//!   requests_per_second: 2
//!   burst_size: 4
//! cache:
//!   ttl_seconds: 60
//! ```

use crate::error::{Error, Result};
use crate::http::{
    HttpClient, HttpClientConfig, RateLimiter, RateLimiterConfig, ResponseCache, RetryPolicy,
    DEFAULT_BACKOFF_FACTOR, DEFAULT_CACHE_SIZE, DEFAULT_CACHE_TTL, DEFAULT_JITTER,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_STATUSES, DEFAULT_TIMEOUT,
};
use crate::types::StringMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Client Settings
// ============================================================================

/// Settings for building an [`HttpClient`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSettings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,

    /// Maximum pooled connections per host
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: StringMap,

    /// Override the default user agent
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Retry settings; retries are disabled when absent
    #[serde(default)]
    pub retry: Option<RetrySettings>,

    /// Rate limit settings; unlimited when absent
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,

    /// Response cache settings; no caching when absent
    #[serde(default)]
    pub cache: Option<CacheSettings>,
}

fn default_timeout_seconds() -> f64 {
    DEFAULT_TIMEOUT.as_secs_f64()
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            max_connections: default_max_connections(),
            headers: StringMap::new(),
            user_agent: None,
            retry: None,
            rate_limit: None,
            cache: None,
        }
    }
}

impl ClientSettings {
    /// Parse settings from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse settings from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a file; `.json` files are parsed as JSON, anything
    /// else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Translate into a validated client configuration
    pub fn to_client_config(&self) -> Result<HttpClientConfig> {
        let mut builder = HttpClientConfig::builder()
            .timeout(seconds("timeout_seconds", self.timeout_seconds)?)
            .max_connections(self.max_connections);

        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }
        if let Some(ref agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        if let Some(ref retry) = self.retry {
            builder = builder.retry(retry.to_policy()?);
        }
        if let Some(ref rate_limit) = self.rate_limit {
            builder = builder.rate_limiter(Arc::new(RateLimiter::from_config(rate_limit)?));
        }
        if let Some(ref cache) = self.cache {
            builder = builder.cache(Arc::new(cache.to_cache()?));
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// Build the client described by these settings
    pub fn build_client(&self) -> Result<HttpClient> {
        HttpClient::with_config(self.to_client_config()?)
    }
}

// ============================================================================
// Retry Settings
// ============================================================================

/// Retry policy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay in seconds
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,

    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_backoff_factor() -> f64 {
    DEFAULT_BACKOFF_FACTOR
}

fn default_retry_statuses() -> Vec<u16> {
    DEFAULT_RETRY_STATUSES.to_vec()
}

fn default_jitter() -> f64 {
    DEFAULT_JITTER
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_factor: default_backoff_factor(),
            retry_statuses: default_retry_statuses(),
            jitter: default_jitter(),
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(
            self.max_retries,
            self.backoff_factor,
            self.retry_statuses.iter().copied(),
            self.jitter,
        )
    }
}

// ============================================================================
// Cache Settings
// ============================================================================

/// Response cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    #[serde(default = "default_cache_size")]
    pub max_size: usize,

    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: f64,
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_cache_ttl_seconds() -> f64 {
    DEFAULT_CACHE_TTL.as_secs_f64()
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size: default_cache_size(),
            ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

impl CacheSettings {
    pub fn to_cache(&self) -> Result<ResponseCache> {
        ResponseCache::new(self.max_size, seconds("ttl_seconds", self.ttl_seconds)?)
    }
}

fn seconds(field: &str, value: f64) -> Result<Duration> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::config(
            field,
            format!("must be a positive number of seconds, got {value}"),
        ));
    }
    Duration::try_from_secs_f64(value).map_err(|e| Error::config(field, e.to_string()))
}
