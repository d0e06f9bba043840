//! Tests for the HTTP client module

use super::client::parse_retry_after;
use super::*;
use crate::error::Error;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy::builder()
        .max_retries(max_retries)
        .backoff_factor(0.01)
        .jitter(0.0)
        .build()
        .unwrap()
}

fn client_with(config: HttpClientConfig) -> HttpClient {
    HttpClient::with_config(config).unwrap()
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_connections, 100);
    assert!(config.retry.is_none());
    assert!(config.rate_limiter.is_none());
    assert!(config.cache.is_none());
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .timeout(Duration::from_secs(60))
        .max_connections(8)
        .retry(RetryPolicy::default())
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.max_connections, 8);
    assert_eq!(config.retry, Some(RetryPolicy::default()));
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[test]
fn test_invalid_client_config_rejected() {
    let result = HttpClient::with_config(
        HttpClientConfig::builder()
            .timeout(Duration::ZERO)
            .build(),
    );
    assert!(matches!(
        result,
        Err(Error::InvalidConfiguration { ref field, .. }) if field == "timeout"
    ));

    let result = HttpClient::with_config(HttpClientConfig::builder().max_connections(0).build());
    assert!(matches!(
        result,
        Err(Error::InvalidConfiguration { ref field, .. }) if field == "max_connections"
    ));

    let result = HttpClient::with_config(
        HttpClientConfig::builder()
            .header("bad header", "x")
            .build(),
    );
    assert!(matches!(result, Err(Error::InvalidConfiguration { .. })));
}

#[test]
fn test_request_config_builder() {
    let config = RequestConfig::new()
        .query("page", "1")
        .query("limit", "10")
        .header("X-Request-Id", "abc123")
        .timeout(Duration::from_secs(10));

    assert_eq!(
        config.query,
        vec![
            ("page".to_string(), "1".to_string()),
            ("limit".to_string(), "10".to_string())
        ]
    );
    assert_eq!(
        config.headers.get("X-Request-Id"),
        Some(&"abc123".to_string())
    );
    assert_eq!(config.timeout, Some(Duration::from_secs(10)));
}

#[tokio::test]
async fn test_http_client_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/quote"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-source", "mock")
                .set_body_string("hello"),
        )
        .mount(&mock_server)
        .await;

    let client = HttpClient::new();
    let response = client
        .get(&format!("{}/api/quote", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(response.is_success());
    assert_eq!(response.text(), "hello");
    assert_eq!(response.header("x-source"), Some("mock"));
    assert!(response.url.ends_with("/api/quote"));
}

#[tokio::test]
async fn test_http_client_get_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": 42
        })))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new();
    let data: serde_json::Value = client
        .get_json(&format!("{}/api/data", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(data["value"], 42);
}

#[tokio::test]
async fn test_http_client_get_json_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new();
    let err = client
        .get_json::<serde_json::Value>(&format!("{}/api/broken", mock_server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Http { .. }));
    assert!(std::error::Error::source(&err).is_some());
    assert!(err.url().is_some_and(|u| u.ends_with("/api/broken")));
}

#[tokio::test]
async fn test_http_client_get_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Date,Open\n"))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new();
    let text = client
        .get_text(&format!("{}/data.csv", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(text, "Date,Open\n");
}

#[tokio::test]
async fn test_http_client_query_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("q", "test"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new();
    let response = client
        .get_with_config(
            &format!("{}/api/search", mock_server.uri()),
            RequestConfig::new().query("q", "test").query("page", "2"),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_http_client_default_headers_and_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/secure"))
        .and(header("X-API-Key", "secret123"))
        .and(header(
            "user-agent",
            format!("marketschema/{}", env!("CARGO_PKG_VERSION")).as_str(),
        ))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = client_with(
        HttpClientConfig::builder()
            .header("X-API-Key", "secret123")
            .build(),
    );
    let response = client
        .get(&format!("{}/api/secure", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_request_headers_override_defaults() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/data"))
        .and(header("X-Source", "override"))
        .and(header("user-agent", "Mozilla/5.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_with(
        HttpClientConfig::builder()
            .header("X-Source", "default")
            .build(),
    );
    let response = client
        .get_with_config(
            &format!("{}/api/data", mock_server.uri()),
            RequestConfig::new()
                .header("X-Source", "override")
                .header("User-Agent", "Mozilla/5.0"),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_http_client_404_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_with(HttpClientConfig::builder().retry(fast_retry(3)).build());
    let err = client
        .get(&format!("{}/api/missing", mock_server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
    assert_eq!(err.response_body(), Some("Not found"));
    mock_server.verify().await;
}

#[tokio::test]
async fn test_empty_error_body_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new();
    let err = client.get(&mock_server.uri()).await.unwrap_err();

    assert_eq!(err.status_code(), Some(400));
    assert_eq!(err.response_body(), None);
}

#[tokio::test]
async fn test_http_client_retry_then_succeed() {
    let mock_server = MockServer::start().await;

    // First two calls return 503, third succeeds
    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = client_with(HttpClientConfig::builder().retry(fast_retry(3)).build());
    let response = client
        .get(&format!("{}/api/flaky", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_http_client_retries_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/always-fail"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Server error"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = client_with(HttpClientConfig::builder().retry(fast_retry(2)).build());
    let err = client
        .get(&format!("{}/api/always-fail", mock_server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
    assert_eq!(err.response_body(), Some("Server error"));
    mock_server.verify().await;
}

#[tokio::test]
async fn test_no_retry_without_policy() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new();
    let err = client.get(&mock_server.uri()).await.unwrap_err();

    assert_eq!(err.status_code(), Some(503));
    mock_server.verify().await;
}

#[tokio::test]
async fn test_rate_limited_error_carries_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_string("slow down"),
        )
        .mount(&mock_server)
        .await;

    let client = HttpClient::new();
    let err = client.get(&mock_server.uri()).await.unwrap_err();

    assert!(matches!(err, Error::RateLimited { .. }));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    assert_eq!(err.response_body(), Some("slow down"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_429_waits_at_least_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/limited"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "1")
                .set_body_string("Rate limited"),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = client_with(HttpClientConfig::builder().retry(fast_retry(2)).build());

    let start = Instant::now();
    let response = client
        .get(&format!("{}/api/limited", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(start.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
async fn test_timeout_is_terminal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_with(
        HttpClientConfig::builder()
            .retry(fast_retry(3))
            .timeout(Duration::from_millis(100))
            .build(),
    );
    let err = client
        .get(&format!("{}/api/slow", mock_server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { timeout_ms: 100, .. }));
    assert!(err.url().is_some_and(|u| u.ends_with("/api/slow")));
    mock_server.verify().await;
}

#[tokio::test]
async fn test_per_request_timeout_override() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new();
    let err = client
        .get_with_config(
            &mock_server.uri(),
            RequestConfig::new().timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { timeout_ms: 50, .. }));
}

#[tokio::test]
async fn test_connection_failure() {
    let client = client_with(HttpClientConfig::builder().retry(fast_retry(3)).build());
    let err = client.get("http://127.0.0.1:1/unreachable").await.unwrap_err();

    assert!(matches!(err, Error::Connection { .. }), "got {err:?}");
    assert_eq!(err.url(), Some("http://127.0.0.1:1/unreachable"));
}

#[tokio::test]
async fn test_cache_hit_avoids_network() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/cached"))
        .and(query_param("s", "aapl"))
        .respond_with(ResponseTemplate::new(200).set_body_string("cached body"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let cache = Arc::new(ResponseCache::new(10, Duration::from_secs(60)).unwrap());
    let client = client_with(HttpClientConfig::builder().cache(Arc::clone(&cache)).build());
    let url = format!("{}/api/cached", mock_server.uri());

    for _ in 0..3 {
        let text = client
            .get_text_with_config(&url, RequestConfig::new().query("s", "aapl"))
            .await
            .unwrap();
        assert_eq!(text, "cached body");
    }

    assert_eq!(cache.len().await, 1);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_errors_never_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&mock_server)
        .await;

    let cache = Arc::new(ResponseCache::new(10, Duration::from_secs(60)).unwrap());
    let client = client_with(HttpClientConfig::builder().cache(Arc::clone(&cache)).build());

    assert!(client.get(&mock_server.uri()).await.is_err());
    assert!(client.get(&mock_server.uri()).await.is_err());

    assert!(cache.is_empty().await);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_server_error_not_cached_then_success_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quote"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"v": 1})))
        .mount(&mock_server)
        .await;

    let cache = Arc::new(ResponseCache::new(10, Duration::from_secs(60)).unwrap());
    let client = client_with(HttpClientConfig::builder().cache(Arc::clone(&cache)).build());
    let url = format!("{}/quote", mock_server.uri());

    let err = client.get(&url).await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    assert!(cache.is_empty().await);

    let body: serde_json::Value = client.get_json(&url).await.unwrap();
    assert_eq!(body, serde_json::json!({"v": 1}));

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn test_cache_hit_still_consumes_rate_limit_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let limiter = Arc::new(RateLimiter::new(1.0, Some(2)).unwrap());
    let cache = Arc::new(ResponseCache::new(10, Duration::from_secs(60)).unwrap());
    let client = client_with(
        HttpClientConfig::builder()
            .rate_limiter(Arc::clone(&limiter))
            .cache(cache)
            .build(),
    );

    client.get(&mock_server.uri()).await.unwrap();
    client.get(&mock_server.uri()).await.unwrap();

    assert!(!limiter.try_acquire());
    mock_server.verify().await;
}

#[tokio::test]
async fn test_shared_rate_limiter_across_clients() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let limiter = Arc::new(RateLimiter::new(100.0, Some(2)).unwrap());
    let a = client_with(
        HttpClientConfig::builder()
            .rate_limiter(Arc::clone(&limiter))
            .build(),
    );
    let b = client_with(
        HttpClientConfig::builder()
            .rate_limiter(Arc::clone(&limiter))
            .build(),
    );

    a.get(&mock_server.uri()).await.unwrap();
    b.get(&mock_server.uri()).await.unwrap();

    assert!(!limiter.try_acquire());
}

#[tokio::test]
async fn test_pool_lifecycle() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new();
    assert!(!client.is_open().await);

    client.get(&mock_server.uri()).await.unwrap();
    assert!(client.is_open().await);

    client.close().await;
    client.close().await;
    assert!(!client.is_open().await);

    // re-created on next use
    client.get(&mock_server.uri()).await.unwrap();
    assert!(client.is_open().await);
}

#[tokio::test]
async fn test_scoped_closes_pool() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new();
    let uri = mock_server.uri();
    let result = client.scoped(|c| async move { c.get(&uri).await }).await;

    assert!(result.is_err());
    assert!(!client.is_open().await);
}

#[tokio::test]
async fn test_scoped_closes_pool_when_cancelled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new();
    let uri = mock_server.uri();
    let scope = client.scoped(|c| async move {
        c.get(&uri).await.unwrap();
        std::future::pending::<()>().await;
    });

    let outcome = tokio::time::timeout(Duration::from_millis(200), scope).await;
    assert!(outcome.is_err());
    assert!(!client.is_open().await);
}

#[tokio::test]
async fn test_scoped_closes_pool_when_closure_panics() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = Arc::new(HttpClient::new());
    let task_client = Arc::clone(&client);
    let uri = mock_server.uri();
    let handle = tokio::spawn(async move {
        task_client
            .scoped(|c| async move {
                c.get(&uri).await.unwrap();
                panic!("scope body failed");
            })
            .await
    });

    assert!(handle.await.unwrap_err().is_panic());
    assert!(!client.is_open().await);
}

#[test]
fn test_parse_retry_after() {
    let mut headers = HeaderMap::new();
    assert_eq!(parse_retry_after(&headers), None);

    headers.insert(RETRY_AFTER, HeaderValue::from_static("120"));
    assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(120)));

    headers.insert(
        RETRY_AFTER,
        HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
    );
    assert_eq!(parse_retry_after(&headers), None);

    headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
    assert_eq!(parse_retry_after(&headers), None);
}

#[test]
fn test_http_client_debug() {
    let client = HttpClient::new();
    let debug_str = format!("{client:?}");
    assert!(debug_str.contains("HttpClient"));
    assert!(debug_str.contains("config"));
}
