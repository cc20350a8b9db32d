use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use time::Duration;

use super::{fetch_json, validation_to_error};
use crate::data_source::{
    BarsRequest, CapabilitySet, DataSource, FinancialsRequest, SourceError, SourceFuture,
};
use crate::fundamentals::{line, PRICE_WINDOW_DAYS};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{
    AssetClass, Bar, BarSeries, Dividend, FinancialStatements, Interval, PricePoint, PriceSeries,
    ProviderId, StatementSnapshot, Symbol, UtcDateTime,
};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const TIMESERIES_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";

/// Years of annual statements requested; providers publish four or five.
const STATEMENT_YEARS: u32 = 10;

const INTERVALS: [Interval; 7] = [
    Interval::OneMinute,
    Interval::FiveMinutes,
    Interval::FifteenMinutes,
    Interval::ThirtyMinutes,
    Interval::OneHour,
    Interval::OneDay,
    Interval::OneWeek,
];

const INCOME_TYPES: [(&str, &str); 6] = [
    ("annualEBIT", line::EBIT),
    ("annualEBITDA", line::EBITDA),
    ("annualGrossProfit", line::GROSS_PROFIT),
    ("annualNetIncome", line::NET_INCOME),
    ("annualResearchAndDevelopment", line::RESEARCH_AND_DEVELOPMENT),
    ("annualTotalRevenue", line::TOTAL_REVENUE),
];

const BALANCE_TYPES: [(&str, &str); 4] = [
    ("annualOrdinarySharesNumber", line::ORDINARY_SHARES),
    ("annualStockholdersEquity", line::STOCKHOLDERS_EQUITY),
    ("annualTotalDebt", line::TOTAL_DEBT),
    ("annualTotalAssets", line::TOTAL_ASSETS),
];

/// Yahoo Finance adapter: the stock provider, and last resort for crypto as `BASE-USD`.
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    timeout_ms: u64,
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, timeout_ms: u64) -> Self {
        Self {
            http_client,
            timeout_ms,
        }
    }

    async fn fetch_chart(
        &self,
        ticker: &str,
        interval: Interval,
        start: UtcDateTime,
        end: UtcDateTime,
        with_dividends: bool,
    ) -> Result<YahooChartResult, SourceError> {
        let mut endpoint = format!(
            "{CHART_URL}/{}?period1={}&period2={}&interval={}",
            urlencoding::encode(ticker),
            start.unix_seconds(),
            end.unix_seconds(),
            chart_interval(interval)
        );
        if with_dividends {
            endpoint.push_str("&events=div");
        }

        let request = HttpRequest::get(endpoint)
            .with_header("referer", "https://finance.yahoo.com/")
            .with_timeout_ms(self.timeout_ms);
        let response: YahooChartResponse =
            fetch_json(self.http_client.as_ref(), ProviderId::Yahoo, request).await?;

        if let Some(error) = response.chart.error {
            return Err(SourceError::not_found(format!(
                "yahoo chart error for '{ticker}': {}",
                error.description.unwrap_or(error.code)
            )));
        }

        response
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| SourceError::not_found(format!("no chart data for '{ticker}'")))
    }

    async fn fetch_bars(&self, req: BarsRequest) -> Result<BarSeries, SourceError> {
        if !INTERVALS.contains(&req.interval) {
            return Err(SourceError::unsupported_interval(req.interval));
        }

        let ticker = chart_ticker(&req.symbol, req.asset_class);
        let chart = self
            .fetch_chart(&ticker, req.interval, req.start, req.end, false)
            .await?;

        Ok(BarSeries::new(req.symbol, req.interval, chart.bars()?))
    }

    async fn fetch_statements(
        &self,
        symbol: &Symbol,
        end: UtcDateTime,
    ) -> Result<(StatementSnapshot, StatementSnapshot), SourceError> {
        let types = INCOME_TYPES
            .iter()
            .chain(BALANCE_TYPES.iter())
            .map(|(kind, _)| *kind)
            .collect::<Vec<_>>()
            .join(",");
        let endpoint = format!(
            "{TIMESERIES_URL}/{ticker}?symbol={ticker}&type={types}&period1={}&period2={}",
            end.days_ago(STATEMENT_YEARS * 365).unix_seconds(),
            end.unix_seconds(),
            ticker = urlencoding::encode(symbol.as_str()),
        );
        let request = HttpRequest::get(endpoint)
            .with_header("referer", "https://finance.yahoo.com/")
            .with_timeout_ms(self.timeout_ms);
        let response: YahooTimeseriesResponse =
            fetch_json(self.http_client.as_ref(), ProviderId::Yahoo, request).await?;

        let mut income = Vec::new();
        let mut balance = Vec::new();
        for result in response.timeseries.result.unwrap_or_default() {
            for kind in &result.meta.kinds {
                let target = if let Some((_, label)) =
                    INCOME_TYPES.iter().find(|(candidate, _)| candidate == kind)
                {
                    (&mut income, *label)
                } else if let Some((_, label)) =
                    BALANCE_TYPES.iter().find(|(candidate, _)| candidate == kind)
                {
                    (&mut balance, *label)
                } else {
                    continue;
                };

                let (observations, label) = target;
                for (period, value) in result.reported_values(kind)? {
                    observations.push((label, period, value));
                }
            }
        }

        Ok((
            StatementSnapshot::from_observations(income),
            StatementSnapshot::from_observations(balance),
        ))
    }

    async fn fetch_financials(
        &self,
        req: FinancialsRequest,
    ) -> Result<FinancialStatements, SourceError> {
        let (income_statement, balance_sheet) =
            self.fetch_statements(&req.symbol, req.end).await?;
        if balance_sheet.periods.is_empty() {
            return Err(SourceError::not_found(format!(
                "no annual balance sheet for '{}'",
                req.symbol
            )));
        }

        let history_start = balance_sheet
            .periods
            .first()
            .map(|oldest| oldest.saturating_sub(Duration::days(PRICE_WINDOW_DAYS)))
            .map_or(req.history_start(), |oldest| oldest.min(req.history_start()));

        let chart = self
            .fetch_chart(
                req.symbol.as_str(),
                Interval::OneDay,
                history_start,
                req.end,
                true,
            )
            .await?;

        Ok(FinancialStatements {
            symbol: req.symbol,
            company_name: chart.company_name(),
            income_statement,
            balance_sheet,
            dividends: chart.dividends()?,
            daily_closes: chart.closes()?,
        })
    }
}

impl DataSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::full()
    }

    fn intervals(&self) -> &'static [Interval] {
        &INTERVALS
    }

    fn bars<'a>(&'a self, req: BarsRequest) -> SourceFuture<'a, BarSeries> {
        Box::pin(self.fetch_bars(req))
    }

    fn financials<'a>(&'a self, req: FinancialsRequest) -> SourceFuture<'a, FinancialStatements> {
        Box::pin(self.fetch_financials(req))
    }
}

/// Chart ticker: equities as-is, crypto quoted in USD.
fn chart_ticker(symbol: &Symbol, asset_class: AssetClass) -> String {
    match asset_class {
        AssetClass::Equity => symbol.as_str().to_owned(),
        AssetClass::Crypto => format!("{}-USD", symbol.as_str()),
    }
}

fn chart_interval(interval: Interval) -> &'static str {
    match interval {
        Interval::OneHour => "60m",
        Interval::OneWeek => "1wk",
        other => other.as_str(),
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooChartError>,
}

#[derive(Debug, Deserialize)]
struct YahooChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    meta: YahooChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooChartIndicators,
    #[serde(default)]
    events: Option<YahooChartEvents>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooChartMeta {
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct YahooChartEvents {
    #[serde(default)]
    dividends: HashMap<String, YahooDividend>,
}

#[derive(Debug, Deserialize)]
struct YahooDividend {
    amount: f64,
    date: i64,
}

impl YahooChartResult {
    fn company_name(&self) -> Option<String> {
        self.meta
            .long_name
            .clone()
            .or_else(|| self.meta.short_name.clone())
    }

    fn quote(&self) -> Option<&YahooChartQuote> {
        self.indicators.quote.first()
    }

    fn bars(&self) -> Result<Vec<Bar>, SourceError> {
        let Some(quote) = self.quote() else {
            return Ok(Vec::new());
        };

        let mut bars = Vec::with_capacity(self.timestamp.len());
        for (i, &seconds) in self.timestamp.iter().enumerate() {
            let ts = UtcDateTime::from_unix_seconds(seconds).map_err(validation_to_error)?;

            // Rows with any missing OHLC value are skipped.
            if let (Some(Some(open)), Some(Some(high)), Some(Some(low)), Some(Some(close))) = (
                quote.open.get(i),
                quote.high.get(i),
                quote.low.get(i),
                quote.close.get(i),
            ) {
                let volume = quote.volume.get(i).copied().flatten();
                if let Ok(bar) = Bar::new(ts, *open, *high, *low, *close, volume) {
                    bars.push(bar);
                }
            }
        }

        Ok(bars)
    }

    fn closes(&self) -> Result<PriceSeries, SourceError> {
        let Some(quote) = self.quote() else {
            return Ok(PriceSeries::default());
        };

        let mut points = Vec::with_capacity(self.timestamp.len());
        for (i, &seconds) in self.timestamp.iter().enumerate() {
            if let Some(Some(price)) = quote.close.get(i) {
                let ts = UtcDateTime::from_unix_seconds(seconds).map_err(validation_to_error)?;
                points.push(PricePoint { ts, price: *price });
            }
        }

        Ok(PriceSeries::from_points(points))
    }

    fn dividends(&self) -> Result<Vec<Dividend>, SourceError> {
        let Some(events) = &self.events else {
            return Ok(Vec::new());
        };

        let mut dividends = events
            .dividends
            .values()
            .map(|dividend| {
                UtcDateTime::from_unix_seconds(dividend.date)
                    .map(|ex_date| Dividend {
                        ex_date,
                        amount: dividend.amount,
                    })
                    .map_err(validation_to_error)
            })
            .collect::<Result<Vec<_>, _>>()?;
        dividends.sort_by_key(|dividend| dividend.ex_date);
        Ok(dividends)
    }
}

#[derive(Debug, Deserialize)]
struct YahooTimeseriesResponse {
    timeseries: YahooTimeseriesData,
}

#[derive(Debug, Deserialize)]
struct YahooTimeseriesData {
    #[serde(default)]
    result: Option<Vec<YahooTimeseriesResult>>,
}

#[derive(Debug, Deserialize)]
struct YahooTimeseriesResult {
    meta: YahooTimeseriesMeta,
    #[serde(flatten)]
    fields: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct YahooTimeseriesMeta {
    #[serde(rename = "type", default)]
    kinds: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooReportedPoint {
    as_of_date: String,
    #[serde(default)]
    reported_value: Option<YahooRawValue>,
}

/// Yahoo wraps numbers as `{ "raw": 1.0, "fmt": "1.00" }`.
#[derive(Debug, Deserialize)]
struct YahooRawValue {
    #[serde(default)]
    raw: Option<f64>,
}

impl YahooTimeseriesResult {
    fn reported_values(&self, kind: &str) -> Result<Vec<(UtcDateTime, f64)>, SourceError> {
        let Some(raw) = self.fields.get(kind) else {
            return Ok(Vec::new());
        };

        let points: Vec<Option<YahooReportedPoint>> = serde_json::from_value(raw.clone())
            .map_err(|e| SourceError::internal(format!("failed to parse yahoo {kind}: {e}")))?;

        points
            .into_iter()
            .flatten()
            .filter_map(|point| {
                let value = point.reported_value.and_then(|value| value.raw)?;
                Some(
                    UtcDateTime::parse_date(&point.as_of_date)
                        .map(|period| (period, value))
                        .map_err(validation_to_error),
                )
            })
            .collect()
    }
}
