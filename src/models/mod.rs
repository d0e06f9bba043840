//! Vendor-neutral market data schema
//!
//! Every adapter produces these types regardless of the provider's wire
//! format. Models serialize to the canonical JSON shape (snake_case fields,
//! ISO 8601 UTC timestamps, lowercase enums) and can be checked with
//! `validate()`.

mod types;

pub(crate) use types::check_bar;
pub use types::{
    AssetClass, Currency, DerivativeInfo, Exchange, ExerciseStyle, ExpiryInfo, Instrument, Ohlcv,
    OptionInfo, OptionType, OrderBook, PriceLevel, Quote, SettlementMethod, Side, Symbol, Trade,
    UnderlyingType, VolumeInfo,
};
