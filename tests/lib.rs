//! Shared fakes for behavior tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rsiscope_core::fundamentals::line;
use rsiscope_core::{PricePoint, PriceSeries, StatementSnapshot};

pub use rsiscope_core::{
    data_source::{BarsRequest, CapabilitySet, DataSource, FinancialsRequest, SourceFuture},
    routing::{SourceRouter, SourceStrategy},
    AssetClass, Bar, BarSeries, FinancialStatements, Interval, ProviderId, SourceError,
    SourceErrorKind, Symbol, TradingPair, UtcDateTime,
};

/// In-memory data source with a fixed listing and synthetic bars.
///
/// Bars are generated on every interval boundary inside the requested window,
/// both ends included, so adjacent windows share their boundary bar.
pub struct FakeSource {
    id: ProviderId,
    capabilities: CapabilitySet,
    intervals: &'static [Interval],
    listed: Vec<Symbol>,
    failure: Option<SourceError>,
    financials: HashMap<Symbol, FinancialStatements>,
    bar_requests: Mutex<Vec<BarsRequest>>,
}

impl FakeSource {
    pub fn exchange(id: ProviderId, listed: &[&str]) -> Self {
        Self {
            id,
            capabilities: CapabilitySet::bars_only(),
            intervals: &Interval::ALL,
            listed: listed
                .iter()
                .map(|raw| Symbol::parse(raw).expect("valid symbol"))
                .collect(),
            failure: None,
            financials: HashMap::new(),
            bar_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn stock_provider(listed: &[&str]) -> Self {
        Self {
            capabilities: CapabilitySet::full(),
            ..Self::exchange(ProviderId::Yahoo, listed)
        }
    }

    /// Every bars call fails with `error`.
    pub fn failing(mut self, error: SourceError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn with_financials(mut self, statements: FinancialStatements) -> Self {
        self.financials.insert(statements.symbol.clone(), statements);
        self
    }

    pub fn bar_requests(&self) -> Vec<BarsRequest> {
        self.bar_requests.lock().expect("requests lock").clone()
    }

    fn is_listed(&self, symbol: &Symbol) -> bool {
        self.listed.contains(symbol)
    }
}

impl DataSource for FakeSource {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    fn intervals(&self) -> &'static [Interval] {
        self.intervals
    }

    fn bars<'a>(&'a self, req: BarsRequest) -> SourceFuture<'a, BarSeries> {
        self.bar_requests
            .lock()
            .expect("requests lock")
            .push(req.clone());

        Box::pin(async move {
            if let Some(error) = &self.failure {
                return Err(error.clone());
            }
            if !self.is_listed(&req.symbol) {
                return Err(SourceError::symbol_not_listed(TradingPair::usdt(&req.symbol)));
            }
            Ok(synthetic_bars(&req))
        })
    }

    fn financials<'a>(&'a self, req: FinancialsRequest) -> SourceFuture<'a, FinancialStatements> {
        Box::pin(async move {
            self.financials
                .get(&req.symbol)
                .cloned()
                .ok_or_else(|| SourceError::not_found(format!("no statements for {}", req.symbol)))
        })
    }
}

/// Bars on each interval boundary in `[start, end]`, closing at `100 + n % 7`.
pub fn synthetic_bars(req: &BarsRequest) -> BarSeries {
    let step = req.interval.seconds() as i64;
    let first = req.start.unix_seconds().div_euclid(step) * step;
    let first = if first < req.start.unix_seconds() {
        first + step
    } else {
        first
    };

    let bars = (0..)
        .map(|n| first + n * step)
        .take_while(|seconds| *seconds <= req.end.unix_seconds())
        .map(|seconds| {
            let close = 100.0 + ((seconds / step) % 7) as f64;
            let ts = UtcDateTime::from_unix_seconds(seconds).expect("in range");
            Bar::new(ts, close, close + 1.0, close - 1.0, close, Some(10.0)).expect("valid bar")
        })
        .collect();

    BarSeries::new(req.symbol.clone(), req.interval, bars)
}

pub fn router(sources: Vec<Arc<FakeSource>>) -> SourceRouter {
    SourceRouter::new(
        sources
            .into_iter()
            .map(|source| source as Arc<dyn DataSource>)
            .collect(),
    )
}

pub fn ts(raw: &str) -> UtcDateTime {
    UtcDateTime::parse(raw).expect("valid timestamp")
}

/// Two annual periods with revenue doubling, `shares` outstanding and closes at 50.
pub fn sample_statements(symbol: &str, shares: f64) -> FinancialStatements {
    let periods = [ts("2022-12-31T00:00:00Z"), ts("2023-12-31T00:00:00Z")];
    let income = periods.iter().enumerate().flat_map(|(i, &period)| {
        let scale = (i + 1) as f64;
        [
            (line::TOTAL_REVENUE, period, 1_000.0 * scale),
            (line::GROSS_PROFIT, period, 400.0 * scale),
            (line::NET_INCOME, period, 100.0 * scale),
        ]
    });
    let balance = periods.iter().flat_map(|&period| {
        [
            (line::ORDINARY_SHARES, period, shares),
            (line::STOCKHOLDERS_EQUITY, period, 2_000.0),
        ]
    });
    let closes = periods
        .iter()
        .map(|period| PricePoint {
            ts: *period,
            price: 50.0,
        })
        .collect();

    FinancialStatements {
        symbol: Symbol::parse(symbol).expect("valid"),
        company_name: Some(format!("{symbol} Corp")),
        income_statement: StatementSnapshot::from_observations(income),
        balance_sheet: StatementSnapshot::from_observations(balance),
        dividends: Vec::new(),
        daily_closes: PriceSeries::from_points(closes),
    }
}
