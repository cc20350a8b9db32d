//! Data source trait and request/response types.
//!
//! This module defines the adapter contract (`DataSource`) that every market
//! data provider implements, along with the request types for each endpoint.
//!
//! # Endpoints
//!
//! | Endpoint | Request | Response | Description |
//! |----------|---------|----------|-------------|
//! | Bars | [`BarsRequest`] | [`BarSeries`] | Historical OHLCV data |
//! | Financials | [`FinancialsRequest`] | [`FinancialStatements`] | Annual statements, dividends, daily closes |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AssetClass, BarSeries, FinancialStatements, Interval, ProviderId, Symbol, UtcDateTime,
};

/// Data endpoint type used for routing and capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Bars,
    Financials,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bars => "bars",
            Self::Financials => "financials",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported endpoint matrix for a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub bars: bool,
    pub financials: bool,
}

impl CapabilitySet {
    pub const fn new(bars: bool, financials: bool) -> Self {
        Self { bars, financials }
    }

    pub const fn full() -> Self {
        Self::new(true, true)
    }

    pub const fn bars_only() -> Self {
        Self::new(true, false)
    }

    pub const fn supports(self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Bars => self.bars,
            Endpoint::Financials => self.financials,
        }
    }

    pub fn supported_endpoints(self) -> Vec<&'static str> {
        let mut values = Vec::with_capacity(2);
        if self.bars {
            values.push(Endpoint::Bars.as_str());
        }
        if self.financials {
            values.push(Endpoint::Financials.as_str());
        }
        values
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    UnsupportedEndpoint,
    UnsupportedInterval,
    SymbolNotListed,
    NotFound,
    Unavailable,
    RateLimited,
    InvalidRequest,
    AdapterNotRegistered,
    Internal,
}

/// Structured source error used by router fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    fn with_kind(kind: SourceErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub fn unsupported_endpoint(endpoint: Endpoint) -> Self {
        Self::with_kind(
            SourceErrorKind::UnsupportedEndpoint,
            format!("endpoint '{endpoint}' is not supported by this source"),
            false,
        )
    }

    pub fn unsupported_interval(interval: Interval) -> Self {
        Self::with_kind(
            SourceErrorKind::UnsupportedInterval,
            format!("interval '{interval}' is not offered by this source"),
            false,
        )
    }

    pub fn symbol_not_listed(pair: impl Display) -> Self {
        Self::with_kind(
            SourceErrorKind::SymbolNotListed,
            format!("pair '{pair}' is not listed"),
            false,
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::NotFound, message, false)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::Unavailable, message, true)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::RateLimited, message, true)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::InvalidRequest, message, false)
    }

    pub fn adapter_not_registered(provider: ProviderId) -> Self {
        Self::with_kind(
            SourceErrorKind::AdapterNotRegistered,
            format!("source adapter '{provider}' is not registered"),
            false,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_kind(SourceErrorKind::Internal, message, false)
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::UnsupportedEndpoint => "source.unsupported_endpoint",
            SourceErrorKind::UnsupportedInterval => "source.unsupported_interval",
            SourceErrorKind::SymbolNotListed => "source.symbol_not_listed",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::AdapterNotRegistered => "source.adapter_not_registered",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for bar endpoints.
///
/// The window is `[start, end]`; `new` anchors `end` at the current time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarsRequest {
    pub symbol: Symbol,
    pub asset_class: AssetClass,
    pub interval: Interval,
    pub start: UtcDateTime,
    pub end: UtcDateTime,
}

impl BarsRequest {
    pub fn new(
        symbol: Symbol,
        asset_class: AssetClass,
        interval: Interval,
        lookback_days: u32,
    ) -> Result<Self, SourceError> {
        Self::ending_at(symbol, asset_class, interval, lookback_days, UtcDateTime::now())
    }

    pub fn ending_at(
        symbol: Symbol,
        asset_class: AssetClass,
        interval: Interval,
        lookback_days: u32,
        end: UtcDateTime,
    ) -> Result<Self, SourceError> {
        if lookback_days == 0 {
            return Err(SourceError::invalid_request(
                "bars lookback must be at least one day",
            ));
        }
        Ok(Self {
            symbol,
            asset_class,
            interval,
            start: end.days_ago(lookback_days),
            end,
        })
    }

    /// Same instrument and interval over a narrower window.
    pub fn with_window(&self, start: UtcDateTime, end: UtcDateTime) -> Self {
        Self {
            start,
            end,
            ..self.clone()
        }
    }

    pub fn span(&self) -> Duration {
        self.end.into_inner() - self.start.into_inner()
    }

    /// Number of bars covering the window, rounded up.
    pub fn limit(&self) -> usize {
        let seconds = self.span().whole_seconds().max(0) as u64;
        seconds.div_ceil(self.interval.seconds()).max(1) as usize
    }
}

/// Request payload for the annual statement endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinancialsRequest {
    pub symbol: Symbol,
    /// Years of daily price history requested alongside the statements.
    pub history_years: u32,
    pub end: UtcDateTime,
}

impl FinancialsRequest {
    pub const DEFAULT_HISTORY_YEARS: u32 = 5;

    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            history_years: Self::DEFAULT_HISTORY_YEARS,
            end: UtcDateTime::now(),
        }
    }

    pub fn with_end(mut self, end: UtcDateTime) -> Self {
        self.end = end;
        self
    }

    /// Start of the requested price history, `history_years * 365` days before `end`.
    pub fn history_start(&self) -> UtcDateTime {
        self.end.days_ago(self.history_years.saturating_mul(365))
    }
}

/// Boxed future returned by every adapter call.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Source adapter contract.
///
/// Implementations must be `Send + Sync` as the router shares them across tasks.
/// Adapters return an empty series when the provider answers with no rows; the
/// router decides whether that counts as a failure.
pub trait DataSource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn capabilities(&self) -> CapabilitySet;

    /// Intervals this provider can serve natively.
    fn intervals(&self) -> &'static [Interval];

    fn supports_interval(&self, interval: Interval) -> bool {
        self.intervals().contains(&interval)
    }

    /// Fetches OHLCV bars for the request window.
    fn bars<'a>(&'a self, req: BarsRequest) -> SourceFuture<'a, BarSeries>;

    /// Fetches annual statements, dividends and daily closes for one ticker.
    fn financials<'a>(&'a self, req: FinancialsRequest) -> SourceFuture<'a, FinancialStatements> {
        let _ = req;
        Box::pin(async { Err(SourceError::unsupported_endpoint(Endpoint::Financials)) })
    }
}
