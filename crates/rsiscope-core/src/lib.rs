//! # rsiscope Core
//!
//! Market data retrieval and derived metrics for the rsiscope toolkit.
//!
//! ## Overview
//!
//! - **Canonical domain models** for bars, price series and financial statements
//! - **Provider adapters** for Yahoo Finance and the KuCoin, Kraken and Coinbase exchanges
//! - **Routing logic** with ordered fallback across providers
//! - **Indicators**: RSI, rolling means and a moving-average forecast
//! - **Fundamentals**: nineteen ratio columns with min-max normalization
//! - **Exports** to CSV and ZIP archives
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Yahoo, KuCoin, Kraken, Coinbase) |
//! | [`batch`] | Multi-ticker fundamentals runs |
//! | [`config`] | Credentials and transport settings |
//! | [`data_source`] | Data source trait and request types |
//! | [`domain`] | Domain models (Bar, PriceSeries, StatementSnapshot) |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Validation errors |
//! | [`export`] | CSV and ZIP writers |
//! | [`fundamentals`] | Ratio table and normalization |
//! | [`http_client`] | HTTP client abstraction |
//! | [`indicators`] | RSI and moving averages |
//! | [`paging`] | Chunked retrieval of long intraday windows |
//! | [`research`] | News, AI commentary and forecasts |
//! | [`routing`] | Source routing and fallback |
//! | [`source`] | Provider identifiers |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rsiscope_core::{
//!     indicators, AssetClass, BarsRequest, Interval, ReqwestHttpClient, SourceRouter,
//!     SourceStrategy, Symbol,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = SourceRouter::with_http_client(Arc::new(ReqwestHttpClient::new()), 10_000);
//!     let request = BarsRequest::new(Symbol::parse("BTC")?, AssetClass::Crypto, Interval::OneHour, 30)?;
//!
//!     let routed = router
//!         .route_bars(&request, SourceStrategy::Auto)
//!         .await
//!         .map_err(|failure| failure.summary())?;
//!     let table = indicators::rsi_table(&routed.data.close_prices(), 14)?;
//!     println!("{} rows from {}", table.len(), routed.selected_source);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / User     │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Source Router  │────▶│ Paging           │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Data Source     │────▶│ HTTP Client      │
//! │ (Adapter Trait) │     │ (reqwest)        │
//! └─────────────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Indicators /    │────▶│ CSV / ZIP export │
//! │ Fundamentals    │     └──────────────────┘
//! └─────────────────┘
//! ```
//!
//! ## Security
//!
//! - API keys are read from the environment only and redacted from `Debug` output
//! - Request URLs are logged without their query strings

pub mod adapters;
pub mod batch;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod export;
pub mod fundamentals;
pub mod http_client;
pub mod indicators;
pub mod paging;
pub mod research;
pub mod routing;
pub mod source;

// Adapter implementations
pub use adapters::{CoinbaseAdapter, KrakenAdapter, KucoinAdapter, YahooAdapter};

pub use batch::{analyze_tickers, BatchOutcome};

pub use config::{AppConfig, ConfigError, Secret};

// Data source trait and types
pub use data_source::{
    BarsRequest, CapabilitySet, DataSource, Endpoint, FinancialsRequest, SourceError,
    SourceErrorKind, SourceFuture,
};

// Domain models
pub use domain::{
    AssetClass, Bar, BarSeries, Dividend, FinancialStatements, Interval, PricePoint, PriceSeries,
    StatementSnapshot, Symbol, TradingPair, UtcDateTime,
};

// Envelope types
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};

pub use error::ValidationError;

pub use export::ExportError;

pub use fundamentals::{FinancialsRow, FinancialsTable, FundamentalsReport, Metric, TickerFailure};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};

pub use indicators::RsiPoint;

pub use research::{Forecast, NewsArticle, ResearchClient, ResearchError};

// Routing types
pub use routing::{
    RouteFailure, RouteResult, RouteSuccess, SourceRouter, SourceSnapshot, SourceStrategy,
};

// Source identifiers
pub use source::ProviderId;
