//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: settings file → shared client → source
//! adapters → validated models

use futures::future::join_all;
use marketschema::adapters::{Adapter, AdapterRegistry, OhlcvQuery};
use marketschema::config::ClientSettings;
use marketschema::http::HttpClient;
use marketschema::sources::{BitbankAdapter, StockAnalysisAdapter, StooqAdapter};
use marketschema::Error;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STOOQ_CSV: &str = "Date,Open,High,Low,Close,Volume\n\
    2024-01-04,4697.42,4726.78,4687.53,4688.68,3715480000\n\
    2024-01-05,4690.57,4721.49,4682.11,4697.24,3844370000\n";

fn settings_client(yaml: &str) -> Arc<HttpClient> {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    let settings = ClientSettings::from_file(file.path()).unwrap();
    Arc::new(settings.build_client().unwrap())
}

// ============================================================================
// Settings → Client → Adapter
// ============================================================================

#[tokio::test]
async fn test_stooq_retries_then_serves_from_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/q/d/l/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/q/d/l/"))
        .and(query_param("s", "spx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STOOQ_CSV))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = settings_client(
        "timeout_seconds: 5\n\
         retry:\n  max_retries: 2\n  backoff_factor: 0.01\n  jitter: 0.0\n\
         cache:\n  max_size: 10\n  ttl_seconds: 60\n",
    );
    let adapter = StooqAdapter::new(Some(Arc::clone(&client)))
        .with_base_url(format!("{}/q/d/l/", mock_server.uri()));

    let first = adapter.fetch_ohlcv("spx", &OhlcvQuery::new()).await.unwrap();
    let second = adapter.fetch_ohlcv("spx", &OhlcvQuery::new()).await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert!(first.iter().all(|bar| bar.validate().is_ok()));

    adapter.close().await;
    assert!(client.is_open().await);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_concurrent_symbols_share_one_client() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/q/d/l/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STOOQ_CSV))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = Arc::new(HttpClient::new());
    let adapter = StooqAdapter::new(Some(Arc::clone(&client)))
        .with_base_url(format!("{}/q/d/l/", mock_server.uri()));

    let symbols = ["spx", "aapl.us", "msft.us"];
    let query = OhlcvQuery::new();
    let results = join_all(symbols.iter().map(|s| adapter.fetch_ohlcv(s, &query))).await;

    for (symbol, result) in symbols.iter().zip(results) {
        let bars = result.unwrap();
        assert_eq!(bars[0].symbol.as_str(), *symbol);
    }

    client.close().await;
    assert!(!client.is_open().await);
}

#[tokio::test]
async fn test_rate_limit_spaces_requests_across_adapters() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/btc_jpy/ticker"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": 1,
            "data": {"sell": "101", "buy": "100", "timestamp": 1_704_412_800_000_i64}
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/q/d/l/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STOOQ_CSV))
        .mount(&mock_server)
        .await;

    let client = settings_client("rate_limit:\n  requests_per_second: 10\n  burst_size: 1\n");
    let bitbank = BitbankAdapter::new(Some(Arc::clone(&client))).with_base_url(mock_server.uri());
    let stooq = StooqAdapter::new(Some(Arc::clone(&client)))
        .with_base_url(format!("{}/q/d/l/", mock_server.uri()));

    let start = Instant::now();
    bitbank.fetch_quote("btc_jpy").await.unwrap();
    stooq.fetch_ohlcv("spx", &OhlcvQuery::new()).await.unwrap();
    bitbank.fetch_quote("btc_jpy").await.unwrap();

    // Two refills at 10 rps
    assert!(start.elapsed() >= Duration::from_millis(180), "{:?}", start.elapsed());
}

// ============================================================================
// Error Propagation
// ============================================================================

#[tokio::test]
async fn test_not_found_surfaces_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such symbol"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = settings_client("retry:\n  max_retries: 3\n  backoff_factor: 0.01\n");
    let adapter = StockAnalysisAdapter::new(Some(client))
        .with_base_url(format!("{}/stocks", mock_server.uri()));

    let err = adapter
        .fetch_ohlcv("NOPE", &OhlcvQuery::new())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(404));
    assert_eq!(err.response_body(), Some("no such symbol"));
    mock_server.verify().await;
}

#[tokio::test]
async fn test_bitbank_error_envelope_is_adapter_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xxx_jpy/depth"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": 0, "data": {"code": 10000}})),
        )
        .mount(&mock_server)
        .await;

    let adapter = BitbankAdapter::new(None).with_base_url(mock_server.uri());
    let err = adapter.fetch_orderbook("xxx_jpy").await.unwrap_err();

    assert!(matches!(err, Error::Adapter { ref source_name, .. } if source_name == "bitbank"));
    adapter.close().await;
}

// ============================================================================
// Registry
// ============================================================================

#[tokio::test]
async fn test_registry_capabilities() {
    let registry = AdapterRegistry::builtin();
    let client = Arc::new(HttpClient::new());

    let stooq = registry.create("stooq", Some(Arc::clone(&client))).unwrap();
    let err = stooq.fetch_orderbook("spx").await.unwrap_err();
    assert!(matches!(err, Error::Unsupported { .. }));
    assert_eq!(err.to_string(), "Adapter 'stooq' does not support fetch_orderbook");

    assert!(matches!(
        registry.create("yahoo", None),
        Err(Error::AdapterNotFound { .. })
    ));
}
