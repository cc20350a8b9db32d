use serde::Serialize;

use rsiscope_core::routing::elapsed_ms;
use rsiscope_core::{ProviderId, ResearchClient, ResearchError};
use serde_json::Value;

use crate::cli::CompanyArgs;
use crate::error::CliError;

use super::{source_error, CommandResult};

#[derive(Debug, Serialize)]
struct InsightsResponseData {
    company: String,
    analysis: String,
}

pub async fn run(args: &CompanyArgs, research: &ResearchClient) -> Result<CommandResult, CliError> {
    let company = args.query();
    let started = std::time::Instant::now();
    let outcome = research.insights(&company).await;
    let latency_ms = elapsed_ms(started);

    match outcome {
        Ok(analysis) => {
            let data = serde_json::to_value(InsightsResponseData { company, analysis })?;
            Ok(CommandResult::ok(data, vec![ProviderId::Openai]).with_latency(latency_ms))
        }
        Err(ResearchError::Source(error)) => {
            Ok(CommandResult::ok(Value::Null, vec![ProviderId::Openai])
                .with_errors(vec![source_error(ProviderId::Openai, &error)?])
                .with_latency(latency_ms))
        }
        Err(ResearchError::Config(error)) => Err(error.into()),
        Err(error) => Err(CliError::Command(error.to_string())),
    }
}
