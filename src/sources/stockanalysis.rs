//! stockanalysis.com price history
//!
//! The history page renders an 8-column table:
//!
//! ```text
//! Date        | Open   | High   | Low    | Close  | Adj Close | Change | Volume
//! Feb 2, 2026 | 260.03 | 270.49 | 259.21 | 269.96 | 269.96    | 4.04%  | 73,368,699
//! ```

use crate::adapters::{
    apply_mapping, transforms, Adapter, AdapterBase, ClientOwnership, ModelMapping, OhlcvQuery,
    TransformFn,
};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::models::{check_bar, Ohlcv, Symbol};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, LazyLock};
use tracing::debug;

pub const STOCKANALYSIS_SOURCE: &str = "stockanalysis";
pub const STOCKANALYSIS_BASE_URL: &str = "https://stockanalysis.com/stocks";
pub const STOCKANALYSIS_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const STOCKANALYSIS_COLUMN_COUNT: usize = 8;

const DATE_FORMAT: &str = "%b %d, %Y";

static TABLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static TBODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody").unwrap());
static ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

/// Daily bar with the dividend/split adjusted close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtendedOhlcv {
    pub symbol: Symbol,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

impl ExtendedOhlcv {
    pub fn validate(&self) -> Result<()> {
        check_bar("ExtendedOhlcv", self.open, self.high, self.low, self.close)?;
        if !self.adj_close.is_finite() || self.adj_close <= 0.0 {
            return Err(Error::validation(
                "ExtendedOhlcv",
                format!("adj_close must be positive, got {}", self.adj_close),
            ));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(Error::validation(
                "ExtendedOhlcv",
                format!("volume must be non-negative, got {}", self.volume),
            ));
        }
        Ok(())
    }
}

impl From<ExtendedOhlcv> for Ohlcv {
    fn from(bar: ExtendedOhlcv) -> Self {
        Ohlcv {
            symbol: bar.symbol,
            timestamp: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            quote_volume: None,
        }
    }
}

/// `Jan 5, 2024` to `2024-01-05T00:00:00Z`
pub fn parse_date(value: &str) -> Result<String> {
    let date = NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| Error::transform(format!("invalid date '{value}': {e}")))?;
    Ok(format!("{}T00:00:00Z", date.format("%Y-%m-%d")))
}

/// Strip thousands separators: `73,368,699` to `73368699`
pub fn parse_volume(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::transform("volume is empty"));
    }
    Ok(trimmed.replace(',', ""))
}

fn parse_date_fn() -> TransformFn {
    Arc::new(|v| {
        let s = v
            .as_str()
            .ok_or_else(|| Error::transform(format!("expected date string, got {v}")))?;
        parse_date(s).map(Value::from)
    })
}

fn parse_volume_fn() -> TransformFn {
    Arc::new(|v| {
        let s = v
            .as_str()
            .ok_or_else(|| Error::transform(format!("expected volume string, got {v}")))?;
        transforms::to_float(&Value::from(parse_volume(s)?)).map(Value::from)
    })
}

/// Adapter scraping the stockanalysis.com history table
#[derive(Debug)]
pub struct StockAnalysisAdapter {
    base: AdapterBase,
    base_url: String,
}

impl StockAnalysisAdapter {
    pub fn new(client: Option<Arc<HttpClient>>) -> Self {
        Self {
            base: AdapterBase::new(STOCKANALYSIS_SOURCE, ClientOwnership::from_option(client)),
            base_url: STOCKANALYSIS_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Mapping for the adjusted bar; the plain bar mapping omits `adj_close`
    pub fn extended_ohlcv_mapping(&self) -> Vec<ModelMapping> {
        let mut mappings = self.ohlcv_mapping();
        mappings.push(
            ModelMapping::new("adj_close", "adj_close").with_transform(transforms::to_float_fn()),
        );
        mappings
    }

    /// Download the history page for `symbol`
    pub async fn fetch_html(&self, symbol: &str) -> Result<String> {
        let url = format!("{}/{}/history/", self.base_url, symbol.to_lowercase());
        let request = RequestConfig::new().header("User-Agent", STOCKANALYSIS_USER_AGENT);
        self.base.client().get_text_with_config(&url, request).await
    }

    /// Bars including the adjusted close
    pub async fn fetch_extended(&self, symbol: &str) -> Result<Vec<ExtendedOhlcv>> {
        let html = self.fetch_html(symbol).await?;
        self.parse_html_extended(&html, symbol)
    }

    pub fn parse_html(&self, html: &str, symbol: &str) -> Result<Vec<Ohlcv>> {
        let mappings = self.ohlcv_mapping();
        self.parse_rows(html, symbol)?
            .iter()
            .map(|row| apply_mapping(row, &mappings))
            .collect()
    }

    pub fn parse_html_extended(&self, html: &str, symbol: &str) -> Result<Vec<ExtendedOhlcv>> {
        let mappings = self.extended_ohlcv_mapping();
        self.parse_rows(html, symbol)?
            .iter()
            .map(|row| apply_mapping(row, &mappings))
            .collect()
    }

    /// Extract body rows of the first table as raw JSON records
    fn parse_rows(&self, html: &str, symbol: &str) -> Result<Vec<Value>> {
        if html.trim().is_empty() {
            return Err(Error::html("empty HTML content"));
        }

        let document = Html::parse_document(html);
        let table = document
            .select(&TABLE_SELECTOR)
            .next()
            .ok_or_else(|| Error::html("no table found in HTML"))?;
        let tbody = table
            .select(&TBODY_SELECTOR)
            .next()
            .ok_or_else(|| Error::html("table has no tbody"))?;

        let mut rows = Vec::new();
        for (index, row) in tbody.select(&ROW_SELECTOR).enumerate() {
            let cells: Vec<String> = row.select(&CELL_SELECTOR).map(cell_text).collect();
            if cells.is_empty() {
                continue;
            }
            if cells.len() < STOCKANALYSIS_COLUMN_COUNT {
                return Err(Error::html(format!(
                    "row {}: expected {STOCKANALYSIS_COLUMN_COUNT} columns, got {}",
                    index + 1,
                    cells.len()
                )));
            }
            rows.push(json!({
                "symbol": symbol,
                "date": cells[0],
                "open": cells[1],
                "high": cells[2],
                "low": cells[3],
                "close": cells[4],
                "adj_close": cells[5],
                "volume": cells[7],
            }));
        }

        debug!(symbol, rows = rows.len(), "Parsed stockanalysis table");
        Ok(rows)
    }
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

#[async_trait]
impl Adapter for StockAnalysisAdapter {
    fn source_name(&self) -> &'static str {
        STOCKANALYSIS_SOURCE
    }

    fn ohlcv_mapping(&self) -> Vec<ModelMapping> {
        vec![
            ModelMapping::new("symbol", "symbol"),
            ModelMapping::new("timestamp", "date").with_transform(parse_date_fn()),
            ModelMapping::new("open", "open").with_transform(transforms::to_float_fn()),
            ModelMapping::new("high", "high").with_transform(transforms::to_float_fn()),
            ModelMapping::new("low", "low").with_transform(transforms::to_float_fn()),
            ModelMapping::new("close", "close").with_transform(transforms::to_float_fn()),
            ModelMapping::new("volume", "volume").with_transform(parse_volume_fn()),
        ]
    }

    /// Daily history only; the query is ignored
    async fn fetch_ohlcv(&self, symbol: &str, _query: &OhlcvQuery) -> Result<Vec<Ohlcv>> {
        let html = self.fetch_html(symbol).await?;
        self.parse_html(&html, symbol)
    }

    async fn close(&self) {
        self.base.close().await;
    }
}
