//! CLI module
//!
//! Command-line interface over the bundled sources.
//!
//! # Commands
//!
//! - `sources` - List registered sources
//! - `stooq` - Daily bars for one or more symbols
//! - `bitbank` - Ticker, trades, depth or candles for a pair
//! - `stockanalysis` - Scraped daily bars, optionally with adjusted close

mod commands;
mod runner;

pub use commands::{BitbankCommand, Cli, Commands, OutputFormat};
pub use runner::Runner;
