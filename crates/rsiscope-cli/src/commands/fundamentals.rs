use serde::Serialize;

use rsiscope_core::export::save_fundamentals_zip;
use rsiscope_core::routing::elapsed_ms;
use rsiscope_core::{
    analyze_tickers, AssetClass, Endpoint, FundamentalsReport, SourceRouter, SourceStrategy,
    TickerFailure, UtcDateTime,
};

use crate::cli::FundamentalsArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct FundamentalsResponseData {
    reports: Vec<FundamentalsReport>,
    failures: Vec<TickerFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    archive_entries: Vec<String>,
}

pub async fn run(
    args: &FundamentalsArgs,
    router: &SourceRouter,
    strategy: &SourceStrategy,
) -> Result<CommandResult, CliError> {
    let tickers = args
        .tickers
        .iter()
        .map(|raw| raw.trim())
        .filter(|raw| !raw.is_empty())
        .collect::<Vec<_>>();
    if tickers.is_empty() {
        return Err(CliError::Command(String::from("at least one ticker is required")));
    }

    let as_of = UtcDateTime::now();
    let started = std::time::Instant::now();
    let outcome = analyze_tickers(router, tickers, strategy, as_of).await;
    let latency_ms = elapsed_ms(started);

    let mut warnings = outcome.warnings;
    let mut archive_entries = Vec::new();
    if let Some(path) = &args.zip {
        if outcome.reports.is_empty() {
            warnings.push(String::from("no ticker produced data; archive not written"));
        } else {
            archive_entries = save_fundamentals_zip(path, &outcome.reports, as_of)?;
        }
    }

    let source_chain = if outcome.source_chain.is_empty() {
        router.source_chain_for_strategy(Endpoint::Financials, AssetClass::Equity, strategy)
    } else {
        outcome.source_chain
    };

    let data = serde_json::to_value(FundamentalsResponseData {
        reports: outcome.reports,
        failures: outcome.failures,
        archive_entries,
    })?;

    Ok(CommandResult::ok(data, source_chain)
        .with_errors(outcome.errors)
        .with_warnings(warnings)
        .with_latency(latency_ms))
}
