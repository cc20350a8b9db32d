//! Derived fundamentals: per-period metric table, ratios and normalization.
//!
//! Rows follow the balance sheet's reporting periods in chronological order.
//! Income-statement lines are matched by period date; anything missing reads
//! as zero, and every ratio with a zero or non-finite denominator is zero.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use time::Duration;

use crate::{FinancialStatements, PriceSeries, Symbol, UtcDateTime};

/// Statement line names as published by the provider.
pub mod line {
    pub const EBIT: &str = "EBIT";
    pub const EBITDA: &str = "EBITDA";
    pub const GROSS_PROFIT: &str = "Gross Profit";
    pub const NET_INCOME: &str = "Net Income";
    pub const RESEARCH_AND_DEVELOPMENT: &str = "Research And Development";
    pub const TOTAL_REVENUE: &str = "Total Revenue";
    pub const ORDINARY_SHARES: &str = "Ordinary Shares Number";
    pub const STOCKHOLDERS_EQUITY: &str = "Stockholders Equity";
    pub const TOTAL_DEBT: &str = "Total Debt";
    pub const TOTAL_ASSETS: &str = "Total Assets";
}

/// Days on each side of a period date averaged for the share price.
pub const PRICE_WINDOW_DAYS: i64 = 3;

/// Years of daily closes kept in the price history output.
pub const PRICE_HISTORY_YEARS: u32 = 5;

/// Table columns, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Ebit,
    Ebitda,
    GrossProfit,
    NetIncome,
    ResearchAndDevelopment,
    TotalRevenue,
    OrdinaryShares,
    StockholdersEquity,
    MarketCap,
    CompanyValuePerception,
    DividendYield,
    TotalDebt,
    TotalAssets,
    MarketCapToRevenue,
    MarketCapToGrossProfit,
    MarketCapToNetIncome,
    EquityToRevenue,
    EquityToGrossProfit,
    EquityToNetIncome,
}

impl Metric {
    pub const ALL: [Self; 19] = [
        Self::Ebit,
        Self::Ebitda,
        Self::GrossProfit,
        Self::NetIncome,
        Self::ResearchAndDevelopment,
        Self::TotalRevenue,
        Self::OrdinaryShares,
        Self::StockholdersEquity,
        Self::MarketCap,
        Self::CompanyValuePerception,
        Self::DividendYield,
        Self::TotalDebt,
        Self::TotalAssets,
        Self::MarketCapToRevenue,
        Self::MarketCapToGrossProfit,
        Self::MarketCapToNetIncome,
        Self::EquityToRevenue,
        Self::EquityToGrossProfit,
        Self::EquityToNetIncome,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Ebit => "EBIT",
            Self::Ebitda => "EBITDA",
            Self::GrossProfit => "Gross Profit",
            Self::NetIncome => "Net Income",
            Self::ResearchAndDevelopment => "Research And Development",
            Self::TotalRevenue => "Total Revenue",
            Self::OrdinaryShares => "Ordinary Shares",
            Self::StockholdersEquity => "Stockholders Equity",
            Self::MarketCap => "MarketCap",
            Self::CompanyValuePerception => "Company value perception",
            Self::DividendYield => "Dividend Yield",
            Self::TotalDebt => "Total Debt",
            Self::TotalAssets => "Total Assets",
            Self::MarketCapToRevenue => "MarketCap/Revenue",
            Self::MarketCapToGrossProfit => "MarketCap/Gross Profit",
            Self::MarketCapToNetIncome => "MarketCap/Net Income",
            Self::EquityToRevenue => "Equity/Revenue",
            Self::EquityToGrossProfit => "Equity/Gross Profit",
            Self::EquityToNetIncome => "Equity/Net Income",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// One reporting period; `values` is indexed by [`Metric::ALL`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialsRow {
    pub date: UtcDateTime,
    pub values: [f64; Metric::ALL.len()],
}

impl FinancialsRow {
    pub fn get(&self, metric: Metric) -> f64 {
        self.values[metric.index()]
    }
}

impl Serialize for FinancialsRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(Metric::ALL.len() + 1))?;
        map.serialize_entry("date", &self.date.format_date())?;
        for metric in Metric::ALL {
            map.serialize_entry(metric.label(), &self.get(metric))?;
        }
        map.end()
    }
}

/// Metric table, one row per balance-sheet period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FinancialsTable {
    pub rows: Vec<FinancialsRow>,
}

impl FinancialsTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, metric: Metric) -> Vec<f64> {
        self.rows.iter().map(|row| row.get(metric)).collect()
    }

    /// Rescales every column to growth over its minimum.
    pub fn normalized(&self) -> Self {
        let mut rows = self.rows.clone();
        for metric in Metric::ALL {
            let scaled = normalize(&self.column(metric));
            for (row, value) in rows.iter_mut().zip(scaled) {
                row.values[metric.index()] = value;
            }
        }
        Self { rows }
    }
}

/// `(v - min) / |min|` per entry; the column is returned unchanged when `min == 0`.
///
/// Non-finite inputs count as zero.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let values = values
        .iter()
        .map(|value| if value.is_finite() { *value } else { 0.0 })
        .collect::<Vec<_>>();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);

    if values.is_empty() || min == 0.0 {
        return values;
    }

    values
        .iter()
        .map(|value| (value - min) / min.abs())
        .collect()
}

/// `numerator / denominator`, or zero when the denominator is zero or non-finite.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return 0.0;
    }
    numerator / denominator
}

/// Builds the metric table from raw statements, dividends and daily closes.
pub fn build_table(statements: &FinancialStatements) -> FinancialsTable {
    let income = &statements.income_statement;
    let balance = &statements.balance_sheet;
    let window = Duration::days(PRICE_WINDOW_DAYS);

    let rows = balance
        .periods
        .iter()
        .map(|&period| {
            let income_line = |name: &str| finite_or_zero(income.value_at(name, period));
            let balance_line = |name: &str| finite_or_zero(balance.value_at(name, period));

            let revenue = income_line(line::TOTAL_REVENUE);
            let gross_profit = income_line(line::GROSS_PROFIT);
            let net_income = income_line(line::NET_INCOME);
            let shares = balance_line(line::ORDINARY_SHARES);
            let equity = balance_line(line::STOCKHOLDERS_EQUITY);

            let price = statements
                .daily_closes
                .mean_between(period.saturating_sub(window), period.saturating_add(window))
                .unwrap_or(0.0);
            let market_cap = shares * price;
            let yearly_dividends = statements
                .dividends
                .iter()
                .filter(|dividend| dividend.ex_date.year() == period.year())
                .map(|dividend| dividend.amount)
                .sum::<f64>();

            let mut values = [0.0; Metric::ALL.len()];
            let mut set = |metric: Metric, value: f64| values[metric.index()] = value;
            set(Metric::Ebit, income_line(line::EBIT));
            set(Metric::Ebitda, income_line(line::EBITDA));
            set(Metric::GrossProfit, gross_profit);
            set(Metric::NetIncome, net_income);
            set(Metric::ResearchAndDevelopment, income_line(line::RESEARCH_AND_DEVELOPMENT));
            set(Metric::TotalRevenue, revenue);
            set(Metric::OrdinaryShares, shares);
            set(Metric::StockholdersEquity, equity);
            set(Metric::MarketCap, market_cap);
            set(Metric::CompanyValuePerception, safe_ratio(market_cap, equity));
            set(Metric::DividendYield, safe_ratio(yearly_dividends, price));
            set(Metric::TotalDebt, balance_line(line::TOTAL_DEBT));
            set(Metric::TotalAssets, balance_line(line::TOTAL_ASSETS));
            set(Metric::MarketCapToRevenue, safe_ratio(market_cap, revenue));
            set(Metric::MarketCapToGrossProfit, safe_ratio(market_cap, gross_profit));
            set(Metric::MarketCapToNetIncome, safe_ratio(market_cap, net_income));
            set(Metric::EquityToRevenue, safe_ratio(equity, revenue));
            set(Metric::EquityToGrossProfit, safe_ratio(equity, gross_profit));
            set(Metric::EquityToNetIncome, safe_ratio(equity, net_income));

            FinancialsRow {
                date: period,
                values,
            }
        })
        .collect();

    FinancialsTable { rows }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|value| value.is_finite()).unwrap_or(0.0)
}

/// Everything derived for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundamentalsReport {
    pub symbol: Symbol,
    pub company_name: Option<String>,
    pub table: FinancialsTable,
    pub normalized: FinancialsTable,
    pub price_history: PriceSeries,
}

impl FundamentalsReport {
    /// Derives the report; price history keeps the last five years before `as_of`.
    pub fn from_statements(statements: &FinancialStatements, as_of: UtcDateTime) -> Self {
        let table = build_table(statements);
        let normalized = table.normalized();
        let history_start = as_of.days_ago(PRICE_HISTORY_YEARS * 365);

        Self {
            symbol: statements.symbol.clone(),
            company_name: statements.company_name.clone(),
            table,
            normalized,
            price_history: statements.daily_closes.since(history_start),
        }
    }

    pub fn display_name(&self) -> &str {
        self.company_name
            .as_deref()
            .unwrap_or_else(|| self.symbol.as_str())
    }
}

/// A ticker that could not be analyzed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickerFailure {
    pub symbol: String,
    pub message: String,
}
