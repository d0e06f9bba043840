//! Adapter trait and shared adapter plumbing

use super::mapping::ModelMapping;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::models::{Ohlcv, OrderBook, Quote, Trade};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Parameters for bar requests.
///
/// Sources interpret the fields in their own vocabulary (bitbank takes
/// `1day` / `2024`); sources with a single fixed interval ignore them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OhlcvQuery {
    pub interval: Option<String>,
    pub date: Option<String>,
}

impl OhlcvQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(interval.into());
        self
    }

    #[must_use]
    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

/// A data source translated into the market data schema.
///
/// Mapping hooks describe how provider records become models; fetch methods
/// a source does not offer report [`Error::Unsupported`].
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Registry name of the source
    fn source_name(&self) -> &'static str;

    fn quote_mapping(&self) -> Vec<ModelMapping> {
        Vec::new()
    }

    fn trade_mapping(&self) -> Vec<ModelMapping> {
        Vec::new()
    }

    fn ohlcv_mapping(&self) -> Vec<ModelMapping> {
        Vec::new()
    }

    fn orderbook_mapping(&self) -> Vec<ModelMapping> {
        Vec::new()
    }

    fn instrument_mapping(&self) -> Vec<ModelMapping> {
        Vec::new()
    }

    async fn fetch_quote(&self, _symbol: &str) -> Result<Quote> {
        Err(Error::unsupported(self.source_name(), "fetch_quote"))
    }

    async fn fetch_trades(&self, _symbol: &str) -> Result<Vec<Trade>> {
        Err(Error::unsupported(self.source_name(), "fetch_trades"))
    }

    async fn fetch_ohlcv(&self, _symbol: &str, _query: &OhlcvQuery) -> Result<Vec<Ohlcv>> {
        Err(Error::unsupported(self.source_name(), "fetch_ohlcv"))
    }

    async fn fetch_orderbook(&self, _symbol: &str) -> Result<OrderBook> {
        Err(Error::unsupported(self.source_name(), "fetch_orderbook"))
    }

    /// Release resources held by the adapter
    async fn close(&self) {}
}

/// Who is responsible for closing an adapter's HTTP client
#[derive(Debug)]
pub enum ClientOwnership {
    /// Created for this adapter and closed with it
    Owned(HttpClient),
    /// Supplied by the caller, who closes it
    Shared(Arc<HttpClient>),
}

impl ClientOwnership {
    /// Share `client` when given, otherwise own a default client
    pub fn from_option(client: Option<Arc<HttpClient>>) -> Self {
        match client {
            Some(client) => ClientOwnership::Shared(client),
            None => ClientOwnership::Owned(HttpClient::new()),
        }
    }
}

/// State common to HTTP-backed adapters
#[derive(Debug)]
pub struct AdapterBase {
    source_name: &'static str,
    client: ClientOwnership,
}

impl AdapterBase {
    pub fn new(source_name: &'static str, client: ClientOwnership) -> Self {
        Self {
            source_name,
            client,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source_name
    }

    pub fn client(&self) -> &HttpClient {
        match self.client {
            ClientOwnership::Owned(ref client) => client,
            ClientOwnership::Shared(ref client) => client,
        }
    }

    pub fn owns_client(&self) -> bool {
        matches!(self.client, ClientOwnership::Owned(_))
    }

    /// Close the client if this adapter owns it
    pub async fn close(&self) {
        if let ClientOwnership::Owned(ref client) = self.client {
            debug!(source = self.source_name, "Closing owned HTTP client");
            client.close().await;
        }
    }

    /// Adapter error tagged with this source
    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::adapter(self.source_name, message)
    }
}
