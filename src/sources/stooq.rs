//! Stooq daily bars
//!
//! `GET https://stooq.com/q/d/l/?s={symbol}&i=d` returns CSV:
//!
//! ```text
//! Date,Open,High,Low,Close,Volume
//! 1999-04-06,898.471,919.49,879.213,919.49,890722
//! ```

use crate::adapters::{
    apply_mapping, transforms, Adapter, AdapterBase, ClientOwnership, ModelMapping, OhlcvQuery,
};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::models::Ohlcv;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub const STOOQ_SOURCE: &str = "stooq";
pub const STOOQ_BASE_URL: &str = "https://stooq.com/q/d/l/";
pub const STOOQ_INTERVAL_DAILY: &str = "d";
pub const STOOQ_HEADER: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];

/// Adapter for the stooq.com CSV download endpoint
#[derive(Debug)]
pub struct StooqAdapter {
    base: AdapterBase,
    base_url: String,
}

impl StooqAdapter {
    pub fn new(client: Option<Arc<HttpClient>>) -> Self {
        Self {
            base: AdapterBase::new(STOOQ_SOURCE, ClientOwnership::from_option(client)),
            base_url: STOOQ_BASE_URL.to_string(),
        }
    }

    /// Point the adapter at another host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Download the raw CSV for `symbol`
    pub async fn fetch_csv(&self, symbol: &str) -> Result<String> {
        let request = RequestConfig::new()
            .query("s", symbol)
            .query("i", STOOQ_INTERVAL_DAILY);
        self.base
            .client()
            .get_text_with_config(&self.base_url, request)
            .await
    }

    /// Parse a stooq CSV document into bars for `symbol`.
    ///
    /// The header must match exactly; blank lines are skipped.
    pub fn parse_csv(&self, content: &str, symbol: &str) -> Result<Vec<Ohlcv>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut records = reader.records();

        let header = records
            .next()
            .ok_or_else(|| Error::csv("empty CSV response"))?
            .map_err(|e| Error::csv(e.to_string()))?;
        let header: Vec<&str> = header.iter().map(str::trim).collect();
        if header != STOOQ_HEADER {
            return Err(Error::csv(format!(
                "unexpected header {header:?}, expected {STOOQ_HEADER:?}"
            )));
        }

        let mappings = self.ohlcv_mapping();
        let mut bars = Vec::new();
        for (index, record) in records.enumerate() {
            let record = record.map_err(|e| Error::csv(e.to_string()))?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            if record.len() < STOOQ_HEADER.len() {
                return Err(Error::csv(format!(
                    "row {}: expected {} columns, got {}",
                    index + 1,
                    STOOQ_HEADER.len(),
                    record.len()
                )));
            }

            let raw = json!({
                "symbol": symbol,
                "date": record[0].trim(),
                "open": record[1].trim(),
                "high": record[2].trim(),
                "low": record[3].trim(),
                "close": record[4].trim(),
                "volume": record[5].trim(),
            });
            let bar: Ohlcv = apply_mapping(&raw, &mappings)
                .map_err(|e| Error::csv(format!("row {}: {e}", index + 1)))?;
            bars.push(bar);
        }

        debug!(symbol, bars = bars.len(), "Parsed stooq CSV");
        Ok(bars)
    }
}

#[async_trait]
impl Adapter for StooqAdapter {
    fn source_name(&self) -> &'static str {
        STOOQ_SOURCE
    }

    fn ohlcv_mapping(&self) -> Vec<ModelMapping> {
        vec![
            ModelMapping::new("symbol", "symbol"),
            ModelMapping::new("timestamp", "date").with_transform(transforms::iso_date_fn()),
            ModelMapping::new("open", "open").with_transform(transforms::to_float_fn()),
            ModelMapping::new("high", "high").with_transform(transforms::to_float_fn()),
            ModelMapping::new("low", "low").with_transform(transforms::to_float_fn()),
            ModelMapping::new("close", "close").with_transform(transforms::to_float_fn()),
            ModelMapping::new("volume", "volume").with_transform(transforms::to_float_fn()),
        ]
    }

    /// Daily bars only; the query is ignored
    async fn fetch_ohlcv(&self, symbol: &str, _query: &OhlcvQuery) -> Result<Vec<Ohlcv>> {
        let content = self.fetch_csv(symbol).await?;
        self.parse_csv(&content, symbol)
    }

    async fn close(&self) {
        self.base.close().await;
    }
}
