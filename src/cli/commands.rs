//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fetch market data from bundled sources in a vendor-neutral schema
#[derive(Parser, Debug)]
#[command(name = "marketschema")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// HTTP client settings file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered sources
    Sources,

    /// Daily bars from stooq
    Stooq {
        /// Stooq symbols such as `spx` or `aapl.us`
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// bitbank public market data
    Bitbank {
        #[command(subcommand)]
        command: BitbankCommand,
    },

    /// Daily bars scraped from stockanalysis.com
    Stockanalysis {
        /// Ticker symbols such as `AAPL`
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Include the adjusted close
        #[arg(long)]
        extended: bool,
    },
}

/// bitbank endpoints
#[derive(Subcommand, Debug)]
pub enum BitbankCommand {
    /// Best bid and ask
    Ticker { pair: String },

    /// Recent transactions
    Trades { pair: String },

    /// Order book snapshot
    Depth { pair: String },

    /// Candlesticks
    Candles {
        pair: String,

        /// Candle type (1min ... 1month)
        #[arg(long = "type", default_value = "1day")]
        candle_type: String,

        /// `YYYY` or `YYYYMMDD` depending on the candle type; defaults to today
        #[arg(long)]
        date: Option<String>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one document per line)
    Json,
    /// Indented JSON
    Pretty,
}
