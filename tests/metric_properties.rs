//! Property-style checks for RSI, normalization and ratio guards.

use rsiscope_core::fundamentals::{build_table, line, normalize, safe_ratio, Metric};
use rsiscope_core::indicators::{rolling_mean, rsi};
use rsiscope_core::{Dividend, FinancialStatements, PricePoint, PriceSeries, StatementSnapshot};
use rsiscope_tests::*;

const SAMPLE: [f64; 14] = [
    10.0, 12.0, 11.0, 13.0, 15.0, 14.0, 16.0, 18.0, 17.0, 19.0, 21.0, 20.0, 22.0, 24.0,
];

/// Deterministic pseudo-random walk.
fn random_walk(seed: u64, len: usize) -> Vec<f64> {
    let mut state = seed;
    let mut price = 100.0;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let step = ((state >> 33) % 2001) as f64 / 1000.0 - 1.0;
            price = (price + step).max(1.0);
            price
        })
        .collect()
}

#[test]
fn when_the_series_is_shorter_than_the_period_every_rsi_is_undefined() {
    for len in 0..14 {
        let values = rsi(&SAMPLE[..len], 14).expect("valid period");
        assert_eq!(values.len(), len);
        assert!(values.iter().all(Option::is_none));
    }
}

#[test]
fn when_the_sample_is_used_with_period_five_the_fifth_value_is_the_first_defined() {
    let values = rsi(&SAMPLE, 5).expect("valid period");

    assert!(values[..4].iter().all(Option::is_none));
    let fifth = values[4].expect("defined");
    // Changes 0, 2, -1, 2, 2: gain 6/5, loss 1/5.
    assert!((fifth - (100.0 - 100.0 / 7.0)).abs() < 1e-9);
}

#[test]
fn when_losses_exist_rsi_stays_within_bounds() {
    for seed in 1..20 {
        let prices = random_walk(seed, 200);
        for period in [2, 5, 14, 30] {
            let values = rsi(&prices, period).expect("valid period");
            assert_eq!(values.len(), prices.len());
            assert!(values[..period - 1].iter().all(Option::is_none));
            assert!(values[period - 1..]
                .iter()
                .flatten()
                .all(|value| (0.0..=100.0).contains(value)));
        }
    }
}

#[test]
fn when_prices_never_fall_rsi_is_one_hundred() {
    let rising = (0..40).map(|i| 50.0 + (i / 3) as f64).collect::<Vec<_>>();
    let values = rsi(&rising, 14).expect("valid period");
    assert!(values
        .iter()
        .flatten()
        .all(|value| (*value - 100.0).abs() < f64::EPSILON));
}

#[test]
fn rolling_mean_matches_a_direct_window_average() {
    let prices = random_walk(7, 50);
    let means = rolling_mean(&prices, 5).expect("valid window");
    for (i, mean) in means.iter().enumerate().skip(4) {
        let direct = prices[i - 4..=i].iter().sum::<f64>() / 5.0;
        assert!((mean.expect("defined") - direct).abs() < 1e-9);
    }
}

#[test]
fn when_the_column_minimum_is_nonzero_the_normalized_minimum_is_zero() {
    for column in [
        vec![4.0, 8.0, 6.0],
        vec![-3.0, 1.0, 5.0],
        vec![250.0, 100.0, 175.0, 400.0],
    ] {
        let scaled = normalize(&column);
        let min = scaled.iter().copied().fold(f64::INFINITY, f64::min);
        assert_eq!(min, 0.0);
    }
    assert_eq!(normalize(&[100.0, 150.0]), [0.0, 0.5]);
}

#[test]
fn when_the_column_minimum_is_zero_normalization_is_identity() {
    assert_eq!(normalize(&[0.0, 3.0, 9.0]), [0.0, 3.0, 9.0]);
    assert_eq!(normalize(&[f64::NAN, 2.0]), [0.0, 2.0]);
}

#[test]
fn when_a_denominator_is_zero_or_absent_the_ratio_is_zero() {
    assert_eq!(safe_ratio(10.0, 0.0), 0.0);
    assert_eq!(safe_ratio(10.0, f64::NAN), 0.0);
    assert_eq!(safe_ratio(10.0, f64::INFINITY), 0.0);
    assert_eq!(safe_ratio(10.0, 4.0), 2.5);

    // Given: A balance sheet with shares and equity but an empty income statement
    let period = ts("2023-12-31T00:00:00Z");
    let statements = FinancialStatements {
        symbol: Symbol::parse("ZERO").expect("valid"),
        company_name: None,
        income_statement: StatementSnapshot::default(),
        balance_sheet: StatementSnapshot::from_observations([
            (line::ORDINARY_SHARES, period, 1_000.0),
            (line::STOCKHOLDERS_EQUITY, period, 0.0),
        ]),
        dividends: vec![Dividend {
            ex_date: ts("2023-06-01T00:00:00Z"),
            amount: 1.0,
        }],
        daily_closes: PriceSeries::from_points(vec![PricePoint {
            ts: ts("2023-12-29T00:00:00Z"),
            price: 20.0,
        }]),
    };

    // When: The table is built
    let table = build_table(&statements);

    // Then: Every ratio over a missing or zero line is zero
    let row = &table.rows[0];
    assert_eq!(row.get(Metric::MarketCap), 20_000.0);
    assert_eq!(row.get(Metric::DividendYield), 0.05);
    for metric in [
        Metric::CompanyValuePerception,
        Metric::MarketCapToRevenue,
        Metric::MarketCapToGrossProfit,
        Metric::MarketCapToNetIncome,
        Metric::EquityToRevenue,
        Metric::EquityToGrossProfit,
        Metric::EquityToNetIncome,
    ] {
        assert_eq!(row.get(metric), 0.0, "{}", metric.label());
    }
}
