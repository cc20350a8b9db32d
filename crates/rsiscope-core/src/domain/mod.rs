//! # Domain Models
//!
//! Canonical domain types for rsiscope market data.
//!
//! All models validate their invariants at construction time and carry full
//! serde support for JSON envelopes.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bar`] | OHLCV bar with timestamp |
//! | [`BarSeries`] | Ordered bars for a symbol/interval |
//! | [`PriceSeries`] | Ordered `(timestamp, price)` points |
//! | [`StatementSnapshot`] | Statement line items per reporting period |
//! | [`FinancialStatements`] | Raw per-ticker statement bundle |
//! | [`Symbol`] | Validated ticker |
//! | [`TradingPair`] | Crypto `BASE/QUOTE` pair |
//! | [`Interval`] | Bar interval (1m .. 1w) |
//! | [`UtcDateTime`] | UTC timestamp |

mod interval;
mod models;
mod symbol;
mod timestamp;

pub use interval::Interval;
pub use models::{
    AssetClass, Bar, BarSeries, Dividend, FinancialStatements, PricePoint, PriceSeries,
    StatementSnapshot,
};
pub use symbol::{Symbol, TradingPair, DEFAULT_QUOTE};
pub use timestamp::UtcDateTime;
