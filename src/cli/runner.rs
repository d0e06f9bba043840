//! CLI runner - executes commands

use crate::adapters::{Adapter, AdapterRegistry, OhlcvQuery};
use crate::cli::commands::{BitbankCommand, Cli, Commands, OutputFormat};
use crate::config::ClientSettings;
use crate::error::{Result, ResultExt};
use crate::http::HttpClient;
use crate::sources::{bitbank, stockanalysis, stooq, StockAnalysisAdapter};
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
    registry: AdapterRegistry,
}

impl Runner {
    /// Runner over the builtin sources
    pub fn new(cli: Cli) -> Self {
        Self::with_registry(cli, AdapterRegistry::builtin())
    }

    pub fn with_registry(cli: Cli, registry: AdapterRegistry) -> Self {
        Self { cli, registry }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        if let Commands::Sources = self.cli.command {
            return self.emit(&json!({ "sources": self.registry.names() }));
        }

        let client = Arc::new(self.build_client()?);
        let result = self.dispatch(&client).await;
        client.close().await;
        result
    }

    /// Shared client from `--config`, or defaults
    pub fn build_client(&self) -> Result<HttpClient> {
        match self.cli.config {
            Some(ref path) => {
                debug!(path = %path.display(), "Loading client settings");
                ClientSettings::from_file(path)
                    .and_then(|settings| settings.build_client())
                    .with_context(|| format!("Failed to load {}", path.display()))
            }
            None => Ok(HttpClient::new()),
        }
    }

    async fn dispatch(&self, client: &Arc<HttpClient>) -> Result<()> {
        match self.cli.command {
            Commands::Sources => Ok(()),
            Commands::Stooq { ref symbols } => {
                let adapter = self
                    .registry
                    .create(stooq::STOOQ_SOURCE, Some(Arc::clone(client)))?;
                self.ohlcv(adapter.as_ref(), symbols, &OhlcvQuery::new()).await
            }
            Commands::Bitbank { ref command } => {
                let adapter = self
                    .registry
                    .create(bitbank::BITBANK_SOURCE, Some(Arc::clone(client)))?;
                self.bitbank(adapter.as_ref(), command).await
            }
            Commands::Stockanalysis {
                ref symbols,
                extended,
            } => {
                if extended {
                    let adapter = StockAnalysisAdapter::new(Some(Arc::clone(client)));
                    self.extended(&adapter, symbols).await
                } else {
                    let adapter = self
                        .registry
                        .create(stockanalysis::STOCKANALYSIS_SOURCE, Some(Arc::clone(client)))?;
                    self.ohlcv(adapter.as_ref(), symbols, &OhlcvQuery::new()).await
                }
            }
        }
    }

    /// Fetch bars for every symbol concurrently, emitting them in input order
    async fn ohlcv(
        &self,
        adapter: &dyn Adapter,
        symbols: &[String],
        query: &OhlcvQuery,
    ) -> Result<()> {
        info!(source = adapter.source_name(), count = symbols.len(), "Fetching bars");
        let results = join_all(
            symbols
                .iter()
                .map(|symbol| adapter.fetch_ohlcv(symbol, query)),
        )
        .await;

        for (symbol, result) in symbols.iter().zip(results) {
            let bars = result?;
            self.emit(&json!({ "symbol": symbol, "bars": bars }))?;
        }
        Ok(())
    }

    async fn extended(&self, adapter: &StockAnalysisAdapter, symbols: &[String]) -> Result<()> {
        let results = join_all(symbols.iter().map(|symbol| adapter.fetch_extended(symbol))).await;
        for (symbol, result) in symbols.iter().zip(results) {
            let bars = result?;
            self.emit(&json!({ "symbol": symbol, "bars": bars }))?;
        }
        Ok(())
    }

    async fn bitbank(&self, adapter: &dyn Adapter, command: &BitbankCommand) -> Result<()> {
        match command {
            BitbankCommand::Ticker { pair } => self.emit(&adapter.fetch_quote(pair).await?),
            BitbankCommand::Trades { pair } => self.emit(&adapter.fetch_trades(pair).await?),
            BitbankCommand::Depth { pair } => self.emit(&adapter.fetch_orderbook(pair).await?),
            BitbankCommand::Candles {
                pair,
                candle_type,
                date,
            } => {
                let mut query = OhlcvQuery::new().interval(candle_type.as_str());
                if let Some(date) = date {
                    query = query.date(date.as_str());
                }
                self.ohlcv(adapter, std::slice::from_ref(pair), &query).await
            }
        }
    }

    /// Serialize `value` in the selected format
    pub fn render<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let rendered = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(value)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        };
        Ok(rendered)
    }

    fn emit<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", self.render(value)?);
        Ok(())
    }
}
