//! Market data model types
//!
//! All timestamps are UTC. Prices are plain `f64`; sizes and volumes must be
//! non-negative.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// ISO 4217 code: three uppercase letters
static CURRENCY_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new("^[A-Z]{3}$").unwrap());

/// ISO 10383 MIC: four uppercase letters
static EXCHANGE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new("^[A-Z]{4}$").unwrap());

/// Contract month, ISO week, or full date: `2024-03`, `2024-W12`, `2024-03-15`
static EXPIRY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}(-\d{2}|-W\d{2}|-\d{2}-\d{2})$").unwrap());

// ============================================================================
// Identifiers
// ============================================================================

/// Instrument identifier (ticker, trading pair, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol, rejecting empty strings
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::validation("Symbol", "must not be empty"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

impl FromStr for Symbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// ISO 4217 currency code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if !CURRENCY_REGEX.is_match(&value) {
            return Err(Error::validation(
                "Currency",
                format!("'{value}' is not a three-letter uppercase code"),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ISO 10383 market identifier code (e.g. `XNYS`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Exchange(String);

impl Exchange {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if !EXCHANGE_REGEX.is_match(&value) {
            return Err(Error::validation(
                "Exchange",
                format!("'{value}' is not a four-letter MIC"),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Exchange {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Exchange> for String {
    fn from(value: Exchange) -> Self {
        value.0
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Aggressor side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(Error::validation("Side", format!("unknown side '{other}'"))),
        }
    }
}

/// Asset class of an instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Equity,
    Fund,
    Bond,
    Future,
    Option,
    Fx,
    Crypto,
    Cfd,
}

// ============================================================================
// Market Data
// ============================================================================

/// Best bid and offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Quote {
    pub symbol: Symbol,
    pub timestamp: DateTime<Utc>,
    pub bid: f64,
    pub ask: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask_size: Option<f64>,
}

impl Quote {
    pub fn validate(&self) -> Result<()> {
        check_price("Quote", "bid", self.bid)?;
        check_price("Quote", "ask", self.ask)?;
        if let Some(size) = self.bid_size {
            check_size("Quote", "bid_size", size)?;
        }
        if let Some(size) = self.ask_size {
            check_size("Quote", "ask_size", size)?;
        }
        Ok(())
    }

    /// Midpoint between bid and ask
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }
}

/// Executed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Trade {
    pub symbol: Symbol,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub size: f64,
    pub side: Side,
}

impl Trade {
    pub fn validate(&self) -> Result<()> {
        check_price("Trade", "price", self.price)?;
        check_size("Trade", "size", self.size)
    }
}

/// Candlestick bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ohlcv {
    pub symbol: Symbol,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_volume: Option<f64>,
}

impl Ohlcv {
    pub fn validate(&self) -> Result<()> {
        check_bar("Ohlcv", self.open, self.high, self.low, self.close)?;
        check_size("Ohlcv", "volume", self.volume)?;
        if let Some(quote_volume) = self.quote_volume {
            check_size("Ohlcv", "quote_volume", quote_volume)?;
        }
        Ok(())
    }
}

/// One price level of an order book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriceLevel {
    pub price: f64,
    pub size: f64,
}

/// Order book snapshot; bids best (highest) first, asks best (lowest) first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderBook {
    pub symbol: Symbol,
    pub timestamp: DateTime<Utc>,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderBook {
    pub fn validate(&self) -> Result<()> {
        for level in self.bids.iter().chain(&self.asks) {
            check_price("OrderBook", "price", level.price)?;
            check_size("OrderBook", "size", level.size)?;
        }
        if self.bids.windows(2).any(|w| w[0].price < w[1].price) {
            return Err(Error::validation("OrderBook", "bids must be in descending price order"));
        }
        if self.asks.windows(2).any(|w| w[0].price > w[1].price) {
            return Err(Error::validation("OrderBook", "asks must be in ascending price order"));
        }
        Ok(())
    }

    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }
}

/// Static description of a tradable instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Instrument {
    pub symbol: Symbol,
    pub asset_class: AssetClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_currency: Option<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_currency: Option<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<Exchange>,
}

impl Instrument {
    /// Currency pairs (fx, crypto) need both legs
    pub fn validate(&self) -> Result<()> {
        if matches!(self.asset_class, AssetClass::Fx | AssetClass::Crypto)
            && (self.base_currency.is_none() || self.quote_currency.is_none())
        {
            return Err(Error::validation(
                "Instrument",
                "fx and crypto instruments require base_currency and quote_currency",
            ));
        }
        Ok(())
    }
}

/// Traded volume and open interest over an interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeInfo {
    pub symbol: Symbol,
    pub timestamp: DateTime<Utc>,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_interest: Option<f64>,
}

impl VolumeInfo {
    pub fn validate(&self) -> Result<()> {
        check_size("VolumeInfo", "volume", self.volume)?;
        check_optional_size("VolumeInfo", "quote_volume", self.quote_volume)?;
        check_optional_size("VolumeInfo", "open_interest", self.open_interest)
    }
}

// ============================================================================
// Derivatives
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderlyingType {
    Stock,
    Index,
    Etf,
    Commodity,
    Currency,
    Crypto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementMethod {
    Cash,
    Physical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseStyle {
    American,
    European,
    Bermudan,
}

/// Contract specification shared by futures, perpetuals and options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DerivativeInfo {
    pub underlying_symbol: Symbol,
    pub underlying_type: UnderlyingType,
    pub multiplier: f64,
    pub tick_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_value_currency: Option<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_order_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_order_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_method: Option<SettlementMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_currency: Option<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_perpetual: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_inverse: Option<bool>,
}

impl DerivativeInfo {
    pub fn validate(&self) -> Result<()> {
        check_positive("DerivativeInfo", "multiplier", self.multiplier)?;
        check_positive("DerivativeInfo", "tick_size", self.tick_size)?;
        check_optional_size("DerivativeInfo", "tick_value", self.tick_value)?;
        check_optional_size("DerivativeInfo", "contract_value", self.contract_value)?;
        check_optional_size("DerivativeInfo", "lot_size", self.lot_size)?;
        check_optional_size("DerivativeInfo", "min_order_size", self.min_order_size)?;
        check_optional_size("DerivativeInfo", "max_order_size", self.max_order_size)?;
        if let Some(price) = self.settlement_price {
            check_price("DerivativeInfo", "settlement_price", price)?;
        }
        if let (Some(min), Some(max)) = (self.min_order_size, self.max_order_size) {
            if min > max {
                return Err(Error::validation(
                    "DerivativeInfo",
                    format!("min_order_size {min} exceeds max_order_size {max}"),
                ));
            }
        }
        Ok(())
    }
}

/// Expiry schedule of a dated contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpiryInfo {
    pub expiration_date: NaiveDate,
    /// Contract period label, e.g. `2024-03`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_trading_day: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_date: Option<NaiveDate>,
}

impl ExpiryInfo {
    pub fn validate(&self) -> Result<()> {
        if let Some(ref expiry) = self.expiry {
            if !EXPIRY_REGEX.is_match(expiry) {
                return Err(Error::validation(
                    "ExpiryInfo",
                    format!("expiry must be YYYY-MM, YYYY-Www or YYYY-MM-DD, got '{expiry}'"),
                ));
            }
        }
        if let Some(last) = self.last_trading_day {
            if last > self.expiration_date {
                return Err(Error::validation(
                    "ExpiryInfo",
                    format!(
                        "last_trading_day {last} is after expiration_date {}",
                        self.expiration_date
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Option terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionInfo {
    pub option_type: OptionType,
    pub strike_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_style: Option<ExerciseStyle>,
}

impl OptionInfo {
    pub fn validate(&self) -> Result<()> {
        check_positive("OptionInfo", "strike_price", self.strike_price)
    }
}

// ============================================================================
// Validation helpers
// ============================================================================

pub(crate) fn check_price(model: &str, field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::validation(model, format!("{field} must be finite, got {value}")))
    }
}

pub(crate) fn check_size(model: &str, field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::validation(
            model,
            format!("{field} must be a non-negative number, got {value}"),
        ))
    }
}

fn check_optional_size(model: &str, field: &str, value: Option<f64>) -> Result<()> {
    value.map_or(Ok(()), |v| check_size(model, field, v))
}

fn check_positive(model: &str, field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::validation(model, format!("{field} must be positive, got {value}")))
    }
}

/// Prices finite and `low <= open, close <= high`
pub(crate) fn check_bar(model: &str, open: f64, high: f64, low: f64, close: f64) -> Result<()> {
    check_price(model, "open", open)?;
    check_price(model, "high", high)?;
    check_price(model, "low", low)?;
    check_price(model, "close", close)?;

    if low > open.min(close) || high < open.max(close) {
        return Err(Error::validation(
            model,
            format!("inconsistent bar: open={open} high={high} low={low} close={close}"),
        ));
    }
    Ok(())
}
