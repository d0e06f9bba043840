//! Bundled data sources
//!
//! - `stooq`: daily bars from CSV downloads
//! - `bitbank`: crypto ticker, trades, candles and depth over JSON
//! - `stockanalysis`: daily bars scraped from an HTML table

pub mod bitbank;
pub mod stockanalysis;
pub mod stooq;

pub use bitbank::BitbankAdapter;
pub use stockanalysis::{ExtendedOhlcv, StockAnalysisAdapter};
pub use stooq::StooqAdapter;

use crate::adapters::{Adapter, AdapterRegistry};
use tracing::warn;

/// Register every bundled source under its source name
pub fn register_builtin(registry: &mut AdapterRegistry) {
    let results = [
        registry.register(bitbank::BITBANK_SOURCE, |client| {
            Box::new(BitbankAdapter::new(client)) as Box<dyn Adapter>
        }),
        registry.register(stockanalysis::STOCKANALYSIS_SOURCE, |client| {
            Box::new(StockAnalysisAdapter::new(client)) as Box<dyn Adapter>
        }),
        registry.register(stooq::STOOQ_SOURCE, |client| {
            Box::new(StooqAdapter::new(client)) as Box<dyn Adapter>
        }),
    ];
    for result in results {
        if let Err(e) = result {
            warn!(error = %e, "Skipping builtin adapter");
        }
    }
}
