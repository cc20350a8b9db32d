use rsiscope_core::research::{self, ResearchError};
use rsiscope_core::routing::elapsed_ms;
use rsiscope_core::{Endpoint, EnvelopeError, SourceRouter, SourceStrategy, Symbol};
use serde_json::Value;

use crate::cli::ForecastArgs;
use crate::error::CliError;

use super::{to_asset_class, CommandResult};

pub async fn run(
    args: &ForecastArgs,
    router: &SourceRouter,
    strategy: &SourceStrategy,
) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.ticker)?;
    let asset_class = to_asset_class(args.asset);
    let started = std::time::Instant::now();

    let outcome = research::forecast(router, symbol, asset_class, strategy.clone()).await;
    let latency_ms = elapsed_ms(started);

    match outcome {
        Ok((forecast, source_chain)) => {
            Ok(CommandResult::ok(serde_json::to_value(forecast)?, source_chain)
                .with_latency(latency_ms))
        }
        Err(ResearchError::Route(failure)) => {
            Ok(CommandResult::ok(Value::Null, failure.source_chain)
                .with_errors(failure.errors)
                .with_warnings(failure.warnings)
                .with_latency(latency_ms))
        }
        Err(ResearchError::InsufficientHistory { have, need }) => {
            let chain = router.source_chain_for_strategy(Endpoint::Bars, asset_class, strategy);
            let error = EnvelopeError::new(
                "forecast.insufficient_history",
                format!("need at least {need} daily closes, got {have}"),
            )?;
            Ok(CommandResult::ok(Value::Null, chain)
                .with_errors(vec![error])
                .with_latency(latency_ms))
        }
        Err(error) => Err(CliError::Command(error.to_string())),
    }
}
