// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # marketschema
//!
//! A vendor-neutral schema for market data, plus the plumbing to fill it from
//! public sources.
//!
//! ## Features
//!
//! - **Schema**: `Quote`, `Trade`, `Ohlcv`, `OrderBook` and `Instrument` with validation
//! - **HTTP**: pooled async client with retry, token-bucket rate limiting and an LRU/TTL cache
//! - **Adapters**: declarative field mappings and a registry of sources
//! - **Sources**: stooq (CSV), bitbank (JSON) and stockanalysis (HTML)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use marketschema::adapters::{Adapter, AdapterRegistry, OhlcvQuery};
//! use marketschema::config::ClientSettings;
//! use std::sync::Arc;
//!
//! # async fn run() -> marketschema::Result<()> {
//! let settings = ClientSettings::from_yaml_str("retry:\n  max_retries: 2\n")?;
//! let client = Arc::new(settings.build_client()?);
//!
//! let registry = AdapterRegistry::builtin();
//! let stooq = registry.create("stooq", Some(Arc::clone(&client)))?;
//! let bars = stooq.fetch_ohlcv("spx", &OhlcvQuery::new()).await?;
//! println!("{} bars", bars.len());
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       Sources                             │
//! │        stooq (CSV)   bitbank (JSON)   stockanalysis (HTML)│
//! └───────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────┬─────────────┴────────┬─────────────────────┐
//! │   Adapters   │        HTTP          │       Models        │
//! ├──────────────┼──────────────────────┼─────────────────────┤
//! │ Mapping      │ Pooled client        │ Quote / Trade       │
//! │ Transforms   │ Retry + backoff      │ Ohlcv / OrderBook   │
//! │ Registry     │ Rate limit / Cache   │ Instrument          │
//! └──────────────┴──────────────────────┴─────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP client with retry, rate limiting and caching
pub mod http;

/// File-based client settings
pub mod config;

/// Market data models
pub mod models;

/// Adapter framework
pub mod adapters;

/// Bundled data sources
pub mod sources;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use adapters::{Adapter, AdapterRegistry};
pub use http::{HttpClient, HttpClientConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
