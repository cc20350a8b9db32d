//! Behavior tests for multi-ticker fundamentals runs and their archive.

use std::fs::File;
use std::io::Read;
use std::sync::Arc;

use rsiscope_core::batch::analyze_tickers;
use rsiscope_core::export::{save_fundamentals_zip, ExportError};
use rsiscope_core::fundamentals::Metric;
use rsiscope_tests::*;

fn provider() -> Arc<FakeSource> {
    Arc::new(
        FakeSource::stock_provider(&[])
            .with_financials(sample_statements("AAPL", 10.0))
            .with_financials(sample_statements("MSFT", 20.0)),
    )
}

#[tokio::test]
async fn when_the_second_of_three_tickers_fails_the_others_still_produce_results() {
    // Given: A provider that knows AAPL and MSFT only
    let router = router(vec![provider()]);
    let as_of = ts("2024-03-05T12:00:00Z");

    // When: Three tickers are analyzed
    let outcome =
        analyze_tickers(&router, ["AAPL", "NOPE", "MSFT"], &SourceStrategy::Auto, as_of).await;

    // Then: Results for the first and third, an error for the second
    let symbols = outcome
        .reports
        .iter()
        .map(|report| report.symbol.as_str())
        .collect::<Vec<_>>();
    assert_eq!(symbols, ["AAPL", "MSFT"]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].symbol, "NOPE");
    assert_eq!(outcome.errors[0].code, "source.not_found");
    assert_eq!(outcome.errors[0].symbol.as_deref(), Some("NOPE"));
    assert!(outcome.warnings.iter().any(|warning| warning.starts_with("skipped 'NOPE'")));

    // And: The archive holds exactly two files per successful ticker
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fundamentals.zip");
    let entries = save_fundamentals_zip(&path, &outcome.reports, as_of).expect("archive");
    assert_eq!(
        entries,
        [
            "AAPL_2024-03-05_financials.csv",
            "AAPL_2024-03-05_price_history.csv",
            "MSFT_2024-03-05_financials.csv",
            "MSFT_2024-03-05_price_history.csv",
        ]
    );

    let mut archive = zip::ZipArchive::new(File::open(&path).expect("open")).expect("zip");
    assert_eq!(archive.len(), 4);
    let mut body = String::new();
    archive
        .by_name("MSFT_2024-03-05_financials.csv")
        .expect("entry")
        .read_to_string(&mut body)
        .expect("read");
    let mut lines = body.lines();
    assert!(lines.next().expect("header").starts_with("date,EBIT,EBITDA,"));
    assert!(lines.next().expect("first period").starts_with("2022-12-31,"));
    assert_eq!(body.lines().count(), 3);
}

#[tokio::test]
async fn when_an_input_is_not_a_valid_ticker_it_is_reported_without_a_provider_call() {
    let router = router(vec![provider()]);

    let outcome =
        analyze_tickers(&router, ["AAPL", "$$$"], &SourceStrategy::Auto, UtcDateTime::now()).await;

    assert_eq!(outcome.reports.len(), 1);
    assert_eq!(outcome.errors[0].code, "validation.symbol");
    assert_eq!(outcome.failures[0].symbol, "$$$");
}

#[tokio::test]
async fn when_a_ticker_is_repeated_in_another_case_it_is_analyzed_once() {
    // Given: The same ticker twice, differing only in case
    let router = router(vec![provider()]);
    let as_of = ts("2024-03-05T12:00:00Z");

    // When: The batch runs and the archive is written
    let outcome =
        analyze_tickers(&router, ["AAPL", "aapl", "MSFT"], &SourceStrategy::Auto, as_of).await;

    // Then: One report per distinct ticker and a warning for the repeat
    let symbols = outcome
        .reports
        .iter()
        .map(|report| report.symbol.as_str())
        .collect::<Vec<_>>();
    assert_eq!(symbols, ["AAPL", "MSFT"]);
    assert!(outcome.failures.is_empty());
    assert!(outcome.warnings.iter().any(|warning| warning.contains("duplicate ticker 'aapl'")));

    // And: The archive is complete
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fundamentals.zip");
    let entries = save_fundamentals_zip(&path, &outcome.reports, as_of).expect("archive");
    assert_eq!(entries.len(), 4);
    let archive = zip::ZipArchive::new(File::open(&path).expect("open")).expect("zip");
    assert_eq!(archive.len(), 4);
}

#[tokio::test]
async fn when_every_ticker_fails_no_archive_is_written() {
    let router = router(vec![provider()]);
    let outcome =
        analyze_tickers(&router, ["NOPE"], &SourceStrategy::Auto, UtcDateTime::now()).await;
    assert!(!outcome.has_successes());

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("empty.zip");
    let error = save_fundamentals_zip(&path, &outcome.reports, UtcDateTime::now())
        .expect_err("nothing to write");

    assert!(matches!(error, ExportError::NothingToExport));
    assert!(!path.exists());
}

#[tokio::test]
async fn ratios_follow_the_statement_values() {
    let router = router(vec![provider()]);
    let outcome = analyze_tickers(
        &router,
        ["AAPL"],
        &SourceStrategy::Auto,
        ts("2024-03-05T00:00:00Z"),
    )
    .await;

    let report = &outcome.reports[0];
    assert_eq!(report.display_name(), "AAPL Corp");
    let latest = report.table.rows.last().expect("row");
    // 10 shares at 50.
    assert_eq!(latest.get(Metric::MarketCap), 500.0);
    assert_eq!(latest.get(Metric::MarketCapToRevenue), 0.25);
    assert_eq!(latest.get(Metric::EquityToNetIncome), 10.0);
    // Revenue doubles between the two periods.
    assert_eq!(report.normalized.column(Metric::TotalRevenue), [0.0, 1.0]);
}
