use serde::Serialize;

use rsiscope_core::export::save_rsi_csv;
use rsiscope_core::indicators::rsi_table;
use rsiscope_core::{BarsRequest, Interval, ProviderId, RsiPoint, SourceRouter, SourceStrategy, Symbol};

use crate::cli::RsiArgs;
use crate::error::CliError;

use super::{to_asset_class, CommandResult};

#[derive(Debug, Serialize)]
struct RsiResponseData {
    symbol: Symbol,
    interval: Interval,
    period: usize,
    source: Option<ProviderId>,
    total_rows: usize,
    latest_rsi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    csv_path: Option<String>,
    rows: Vec<RsiPoint>,
}

pub async fn run(
    args: &RsiArgs,
    router: &SourceRouter,
    strategy: &SourceStrategy,
) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let interval = args.interval.parse::<Interval>()?;
    let request = BarsRequest::new(symbol.clone(), to_asset_class(args.asset), interval, args.days)
        .map_err(|error| CliError::Command(error.to_string()))?;

    let route = match router.route_bars(&request, strategy.clone()).await {
        Ok(route) => route,
        Err(failure) => {
            let data = serde_json::to_value(RsiResponseData {
                symbol,
                interval,
                period: args.period,
                source: None,
                total_rows: 0,
                latest_rsi: None,
                csv_path: None,
                rows: Vec::new(),
            })?;
            return Ok(CommandResult::ok(data, failure.source_chain)
                .with_errors(failure.errors)
                .with_warnings(failure.warnings)
                .with_latency(failure.latency_ms));
        }
    };

    let rows = rsi_table(&route.data.close_prices(), args.period)?;
    if let Some(path) = &args.csv {
        save_rsi_csv(path, &rows)?;
    }

    let total_rows = rows.len();
    let latest_rsi = rows.iter().rev().find_map(|row| row.rsi);
    let rows = match args.tail {
        Some(tail) => rows[total_rows.saturating_sub(tail)..].to_vec(),
        None => rows,
    };

    let data = serde_json::to_value(RsiResponseData {
        symbol,
        interval,
        period: args.period,
        source: Some(route.selected_source),
        total_rows,
        latest_rsi,
        csv_path: args.csv.as_ref().map(|path| path.display().to_string()),
        rows,
    })?;

    Ok(CommandResult::ok(data, route.source_chain)
        .with_recovered_errors(&route.errors)
        .with_warnings(route.warnings)
        .with_latency(route.latency_ms))
}
