//! Error types for marketschema
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! The HTTP variants form the transport taxonomy surfaced by
//! [`HttpClient`](crate::http::HttpClient): every one of them carries the URL
//! of the failed request, and the status variants carry the status code and
//! response body so adapters can branch on them (e.g. 404 → "not found").

use std::time::Duration;
use thiserror::Error;

/// Boxed low-level cause preserved on generic HTTP errors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for marketschema
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Invalid configuration for '{field}': {message}")]
    InvalidConfiguration { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP timeout after {timeout_ms}ms: {url}")]
    Timeout {
        url: String,
        timeout_ms: u64,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("HTTP connection error for {url}: {message}")]
    Connection {
        url: String,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("HTTP {status} for {url}")]
    HttpStatus {
        url: String,
        status: u16,
        body: Option<String>,
    },

    #[error("Rate limited (429) for {url}")]
    RateLimited {
        url: String,
        body: Option<String>,
        retry_after: Option<Duration>,
    },

    #[error("HTTP error: {message}")]
    Http {
        url: Option<String>,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    // ============================================================================
    // Schema / Adapter Errors
    // ============================================================================
    #[error("Validation failed for {model}: {message}")]
    Validation { model: String, message: String },

    #[error("Mapping error: {message}")]
    Mapping { message: String },

    #[error("Transform error: {message}")]
    Transform { message: String },

    #[error("Adapter '{source_name}' error: {message}")]
    Adapter {
        source_name: String,
        message: String,
    },

    #[error("Adapter '{source_name}' does not support {operation}")]
    Unsupported {
        source_name: String,
        operation: String,
    },

    #[error("Adapter '{name}' is already registered")]
    DuplicateAdapter { name: String },

    #[error("Adapter '{name}' not found")]
    AdapterNotFound { name: String },

    // ============================================================================
    // Decoding Errors
    // ============================================================================
    #[error("CSV parsing error: {message}")]
    CsvParse { message: String },

    #[error("HTML parsing error: {message}")]
    HtmlParse { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid configuration error
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(url: impl Into<String>, status: u16, body: Option<String>) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            body,
        }
    }

    /// Create a generic HTTP error with a preserved cause
    pub fn http(
        url: Option<String>,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Http {
            url,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a validation error
    pub fn validation(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Create a mapping error
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
        }
    }

    /// Create a transform error
    pub fn transform(message: impl Into<String>) -> Self {
        Self::Transform {
            message: message.into(),
        }
    }

    /// Create an adapter error
    pub fn adapter(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Adapter {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported-operation error
    pub fn unsupported(source_name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            source_name: source_name.into(),
            operation: operation.into(),
        }
    }

    /// Create a CSV error
    pub fn csv(message: impl Into<String>) -> Self {
        Self::CsvParse {
            message: message.into(),
        }
    }

    /// Create an HTML error
    pub fn html(message: impl Into<String>) -> Self {
        Self::HtmlParse {
            message: message.into(),
        }
    }

    /// URL of the request that failed, for HTTP errors
    pub fn url(&self) -> Option<&str> {
        match self {
            Error::Timeout { url, .. }
            | Error::Connection { url, .. }
            | Error::HttpStatus { url, .. }
            | Error::RateLimited { url, .. } => Some(url),
            Error::Http { url, .. } => url.as_deref(),
            _ => None,
        }
    }

    /// Status code for status and rate-limit errors
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            Error::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Response body for status and rate-limit errors
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Error::HttpStatus { body, .. } | Error::RateLimited { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    /// Retry-After hint carried by a 429 error
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Check if this error is worth retrying by a caller.
    ///
    /// The client itself only retries status errors through its
    /// [`RetryPolicy`](crate::http::RetryPolicy); timeouts and connection
    /// failures are terminal there but still reported as transient here.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout { .. } | Error::Connection { .. } | Error::RateLimited { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for marketschema
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
