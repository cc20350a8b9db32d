use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Interval, Symbol, UtcDateTime, ValidationError};

/// Instrument class selecting the retrieval path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Crypto,
}

impl AssetClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equity => "equity",
            Self::Crypto => "crypto",
        }
    }
}

impl Display for AssetClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stock" | "equity" => Ok(Self::Equity),
            "crypto" => Ok(Self::Crypto),
            other => Err(ValidationError::InvalidAssetClass {
                value: other.to_owned(),
            }),
        }
    }
}

/// OHLCV bar record for a given interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: UtcDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

impl Bar {
    pub fn new(
        ts: UtcDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;
        if let Some(volume) = volume {
            validate_non_negative("volume", volume)?;
        }

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Series wrapper returned by bar endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pub symbol: Symbol,
    pub interval: Interval,
    pub bars: Vec<Bar>,
}

impl BarSeries {
    /// Builds a series with bars sorted by timestamp and duplicates dropped.
    pub fn new(symbol: Symbol, interval: Interval, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|bar| bar.ts);
        bars.dedup_by_key(|bar| bar.ts);
        Self {
            symbol,
            interval,
            bars,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Appends bars strictly newer than the current last bar.
    pub fn extend_after_last(&mut self, bars: Vec<Bar>) {
        for bar in bars {
            let is_newer = self.bars.last().map_or(true, |last| bar.ts > last.ts);
            if is_newer {
                self.bars.push(bar);
            }
        }
    }

    pub fn close_prices(&self) -> PriceSeries {
        PriceSeries::from_points(
            self.bars
                .iter()
                .map(|bar| PricePoint {
                    ts: bar.ts,
                    price: bar.close,
                })
                .collect(),
        )
    }
}

/// Single `(timestamp, price)` observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub ts: UtcDateTime,
    pub price: f64,
}

/// Time-ordered price observations with strictly increasing timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn from_points(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|point| point.ts);
        points.dedup_by_key(|point| point.ts);
        Self { points }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.price).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points at or after `start`.
    pub fn since(&self, start: UtcDateTime) -> Self {
        Self {
            points: self
                .points
                .iter()
                .copied()
                .filter(|point| point.ts >= start)
                .collect(),
        }
    }

    /// Mean price over the inclusive window `[start, end]`, `None` when empty.
    pub fn mean_between(&self, start: UtcDateTime, end: UtcDateTime) -> Option<f64> {
        let (sum, count) = self
            .points
            .iter()
            .filter(|point| point.ts >= start && point.ts <= end)
            .fold((0.0, 0_usize), |(sum, count), point| {
                (sum + point.price, count + 1)
            });

        (count > 0).then(|| sum / count as f64)
    }
}

/// Cash dividend paid on `ex_date`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub ex_date: UtcDateTime,
    pub amount: f64,
}

/// One financial statement: named line items, one value per reporting period.
///
/// Values may be individually missing; readers treat absence as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementSnapshot {
    pub periods: Vec<UtcDateTime>,
    pub lines: BTreeMap<String, Vec<Option<f64>>>,
}

impl StatementSnapshot {
    /// Builds a snapshot from `(line, period, value)` observations.
    pub fn from_observations<I, S>(observations: I) -> Self
    where
        I: IntoIterator<Item = (S, UtcDateTime, f64)>,
        S: Into<String>,
    {
        let observations = observations
            .into_iter()
            .map(|(line, period, value)| (line.into(), period, value))
            .collect::<Vec<_>>();

        let mut periods = observations
            .iter()
            .map(|(_, period, _)| *period)
            .collect::<Vec<_>>();
        periods.sort();
        periods.dedup();

        let mut lines: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
        for (line, period, value) in observations {
            let column = lines
                .entry(line)
                .or_insert_with(|| vec![None; periods.len()]);
            if let Ok(index) = periods.binary_search(&period) {
                column[index] = Some(value);
            }
        }

        Self { periods, lines }
    }

    /// Value of `name` at the given period, `None` when the line or period is absent.
    pub fn value_at(&self, name: &str, period: UtcDateTime) -> Option<f64> {
        let index = self.periods.iter().position(|candidate| *candidate == period)?;
        self.lines.get(name)?.get(index).copied().flatten()
    }
}

/// Raw statement data retrieved for one ticker, before any derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatements {
    pub symbol: Symbol,
    pub company_name: Option<String>,
    pub income_statement: StatementSnapshot,
    pub balance_sheet: StatementSnapshot,
    pub dividends: Vec<Dividend>,
    pub daily_closes: PriceSeries,
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> UtcDateTime {
        UtcDateTime::parse(raw).expect("timestamp")
    }

    #[test]
    fn rejects_invalid_bar_bounds() {
        let err = Bar::new(ts("2024-01-01T00:00:00Z"), 10.0, 12.0, 9.0, 12.5, Some(10.0))
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidBarBounds));
    }

    #[test]
    fn parses_asset_class_aliases() {
        assert_eq!(AssetClass::from_str("Stock").expect("valid"), AssetClass::Equity);
        assert_eq!(AssetClass::from_str("crypto").expect("valid"), AssetClass::Crypto);
        assert!(AssetClass::from_str("bond").is_err());
    }

    #[test]
    fn bar_series_orders_and_dedupes() {
        let a = Bar::new(ts("2024-01-02T00:00:00Z"), 2.0, 2.0, 2.0, 2.0, None).expect("bar");
        let b = Bar::new(ts("2024-01-01T00:00:00Z"), 1.0, 1.0, 1.0, 1.0, None).expect("bar");
        let series = BarSeries::new(
            Symbol::parse("BTC").expect("symbol"),
            Interval::OneDay,
            vec![a.clone(), b, a],
        );
        assert_eq!(series.close_prices().prices(), vec![1.0, 2.0]);
    }

    #[test]
    fn mean_between_is_inclusive_and_empty_aware() {
        let series = PriceSeries::from_points(vec![
            PricePoint { ts: ts("2024-01-01T00:00:00Z"), price: 10.0 },
            PricePoint { ts: ts("2024-01-03T00:00:00Z"), price: 20.0 },
            PricePoint { ts: ts("2024-01-09T00:00:00Z"), price: 90.0 },
        ]);

        let mean = series
            .mean_between(ts("2024-01-01T00:00:00Z"), ts("2024-01-03T00:00:00Z"))
            .expect("two points in window");
        assert!((mean - 15.0).abs() < f64::EPSILON);
        assert!(series
            .mean_between(ts("2024-02-01T00:00:00Z"), ts("2024-02-07T00:00:00Z"))
            .is_none());
    }

    #[test]
    fn missing_statement_lines_have_no_value() {
        let period = ts("2023-12-31T00:00:00Z");
        let snapshot = StatementSnapshot::from_observations(vec![("Net Income", period, 5.0)]);

        assert_eq!(snapshot.value_at("Net Income", period), Some(5.0));
        assert_eq!(snapshot.value_at("EBIT", period), None);
        assert_eq!(snapshot.value_at("Net Income", ts("2022-12-31T00:00:00Z")), None);
    }
}
