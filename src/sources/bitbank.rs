//! bitbank public REST API
//!
//! Every endpoint answers with an envelope `{"success": 1, "data": {...}}`;
//! failures carry `{"success": 0, "data": {"code": N}}`.

use crate::adapters::{
    apply_mapping, transforms, Adapter, AdapterBase, ClientOwnership, ModelMapping, OhlcvQuery,
};
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{Ohlcv, OrderBook, PriceLevel, Quote, Trade};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub const BITBANK_SOURCE: &str = "bitbank";
pub const BITBANK_BASE_URL: &str = "https://public.bitbank.cc";
pub const BITBANK_DEFAULT_CANDLE_TYPE: &str = "1day";

/// Candle types bitbank accepts, keyed by the date granularity they take
const DAILY_DATE_CANDLES: [&str; 4] = ["1min", "5min", "15min", "30min"];
const YEARLY_DATE_CANDLES: [&str; 6] = ["4hour", "8hour", "12hour", "1day", "1week", "1month"];
const HOUR_CANDLE: &str = "1hour";

/// Date format required by a candle type: `YYYYMMDD` for intraday
/// granularities up to one hour, `YYYY` otherwise
fn candle_date_format(candle_type: &str) -> Option<&'static str> {
    if DAILY_DATE_CANDLES.contains(&candle_type) || candle_type == HOUR_CANDLE {
        Some("%Y%m%d")
    } else if YEARLY_DATE_CANDLES.contains(&candle_type) {
        Some("%Y")
    } else {
        None
    }
}

/// Adapter for the bitbank exchange
#[derive(Debug)]
pub struct BitbankAdapter {
    base: AdapterBase,
    base_url: String,
}

impl BitbankAdapter {
    pub fn new(client: Option<Arc<HttpClient>>) -> Self {
        Self {
            base: AdapterBase::new(BITBANK_SOURCE, ClientOwnership::from_option(client)),
            base_url: BITBANK_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn price_level_mapping(&self) -> Vec<ModelMapping> {
        vec![
            ModelMapping::new("price", "0").with_transform(transforms::to_float_fn()),
            ModelMapping::new("size", "1").with_transform(transforms::to_float_fn()),
        ]
    }

    /// GET `{base}/{pair}/{path}` and return the unwrapped `data` object
    async fn fetch_data(&self, pair: &str, path: &str) -> Result<Value> {
        let url = format!("{}/{pair}/{path}", self.base_url);
        let envelope: Value = self.base.client().get_json(&url).await?;
        self.unwrap_envelope(envelope)
    }

    fn unwrap_envelope(&self, mut envelope: Value) -> Result<Value> {
        match envelope.get("success").and_then(Value::as_i64) {
            Some(1) => {}
            _ => {
                let code = envelope
                    .pointer("/data/code")
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "unknown".to_string());
                return Err(self.base.error(format!("API error: code {code}")));
            }
        }
        match envelope.get_mut("data").map(Value::take) {
            Some(data @ Value::Object(_)) => Ok(data),
            _ => Err(self.base.error("response has no data object")),
        }
    }

    /// Inject the pair into a record so mappings can read it
    fn with_symbol(record: &Value, pair: &str) -> Value {
        let mut record = record.clone();
        if let Value::Object(ref mut object) = record {
            object.insert("symbol".to_string(), Value::from(pair));
        }
        record
    }

    fn parse_levels(&self, data: &Value, side: &str) -> Result<Vec<PriceLevel>> {
        let mappings = self.price_level_mapping();
        data.get(side)
            .and_then(Value::as_array)
            .ok_or_else(|| self.base.error(format!("depth response has no '{side}' array")))?
            .iter()
            .map(|level| apply_mapping(level, &mappings))
            .collect()
    }

    pub fn parse_ticker(&self, data: &Value, pair: &str) -> Result<Quote> {
        apply_mapping(&Self::with_symbol(data, pair), &self.quote_mapping())
    }

    pub fn parse_transactions(&self, data: &Value, pair: &str) -> Result<Vec<Trade>> {
        let mappings = self.trade_mapping();
        data.get("transactions")
            .and_then(Value::as_array)
            .ok_or_else(|| self.base.error("transactions response has no 'transactions' array"))?
            .iter()
            .map(|trade| apply_mapping(&Self::with_symbol(trade, pair), &mappings))
            .collect()
    }

    pub fn parse_candlestick(&self, data: &Value, pair: &str) -> Result<Vec<Ohlcv>> {
        let rows = data
            .pointer("/candlestick/0/ohlcv")
            .and_then(Value::as_array)
            .ok_or_else(|| self.base.error("candlestick response has no ohlcv rows"))?;
        let mappings = self.ohlcv_mapping();
        rows.iter()
            .map(|row| apply_mapping(&json!({"symbol": pair, "ohlcv": row}), &mappings))
            .collect()
    }

    pub fn parse_depth(&self, data: &Value, pair: &str) -> Result<OrderBook> {
        let mut book: OrderBook =
            apply_mapping(&Self::with_symbol(data, pair), &self.orderbook_mapping())?;
        book.bids = self.parse_levels(data, "bids")?;
        book.asks = self.parse_levels(data, "asks")?;
        Ok(book)
    }
}

#[async_trait]
impl Adapter for BitbankAdapter {
    fn source_name(&self) -> &'static str {
        BITBANK_SOURCE
    }

    fn quote_mapping(&self) -> Vec<ModelMapping> {
        vec![
            ModelMapping::new("symbol", "symbol"),
            ModelMapping::new("timestamp", "timestamp")
                .with_transform(transforms::unix_timestamp_ms_fn()),
            ModelMapping::new("bid", "buy").with_transform(transforms::to_float_fn()),
            ModelMapping::new("ask", "sell").with_transform(transforms::to_float_fn()),
        ]
    }

    fn trade_mapping(&self) -> Vec<ModelMapping> {
        vec![
            ModelMapping::new("symbol", "symbol"),
            ModelMapping::new("timestamp", "executed_at")
                .with_transform(transforms::unix_timestamp_ms_fn()),
            ModelMapping::new("price", "price").with_transform(transforms::to_float_fn()),
            ModelMapping::new("size", "amount").with_transform(transforms::to_float_fn()),
            ModelMapping::new("side", "side").with_transform(transforms::side_from_string_fn()),
        ]
    }

    /// Rows are `[open, high, low, close, volume, timestamp_ms]`
    fn ohlcv_mapping(&self) -> Vec<ModelMapping> {
        vec![
            ModelMapping::new("symbol", "symbol"),
            ModelMapping::new("open", "ohlcv.0").with_transform(transforms::to_float_fn()),
            ModelMapping::new("high", "ohlcv.1").with_transform(transforms::to_float_fn()),
            ModelMapping::new("low", "ohlcv.2").with_transform(transforms::to_float_fn()),
            ModelMapping::new("close", "ohlcv.3").with_transform(transforms::to_float_fn()),
            ModelMapping::new("volume", "ohlcv.4").with_transform(transforms::to_float_fn()),
            ModelMapping::new("timestamp", "ohlcv.5")
                .with_transform(transforms::unix_timestamp_ms_fn()),
        ]
    }

    /// Levels are filled separately from `bids` / `asks`
    fn orderbook_mapping(&self) -> Vec<ModelMapping> {
        vec![
            ModelMapping::new("symbol", "symbol"),
            ModelMapping::new("timestamp", "timestamp")
                .with_transform(transforms::unix_timestamp_ms_fn()),
            ModelMapping::constant("bids", json!([])),
            ModelMapping::constant("asks", json!([])),
        ]
    }

    async fn fetch_quote(&self, pair: &str) -> Result<Quote> {
        let data = self.fetch_data(pair, "ticker").await?;
        self.parse_ticker(&data, pair)
    }

    async fn fetch_trades(&self, pair: &str) -> Result<Vec<Trade>> {
        let data = self.fetch_data(pair, "transactions").await?;
        self.parse_transactions(&data, pair)
    }

    /// Candles of `query.interval` (default `1day`) for `query.date`,
    /// defaulting to the current UTC year or day as the type requires
    async fn fetch_ohlcv(&self, pair: &str, query: &OhlcvQuery) -> Result<Vec<Ohlcv>> {
        let candle_type = query
            .interval
            .as_deref()
            .unwrap_or(BITBANK_DEFAULT_CANDLE_TYPE);
        let date_format = candle_date_format(candle_type).ok_or_else(|| {
            self.base
                .error(format!("unsupported candle type '{candle_type}'"))
        })?;
        let date = match query.date {
            Some(ref date) => date.clone(),
            None => Utc::now().format(date_format).to_string(),
        };

        debug!(pair, candle_type, date = %date, "Fetching bitbank candles");
        let data = self
            .fetch_data(pair, &format!("candlestick/{candle_type}/{date}"))
            .await?;
        self.parse_candlestick(&data, pair)
    }

    async fn fetch_orderbook(&self, pair: &str) -> Result<OrderBook> {
        let data = self.fetch_data(pair, "depth").await?;
        self.parse_depth(&data, pair)
    }

    async fn close(&self) {
        self.base.close().await;
    }
}
