use serde::Serialize;

use rsiscope_core::routing::elapsed_ms;
use rsiscope_core::{NewsArticle, ProviderId, ResearchClient, ResearchError};
use serde_json::Value;

use crate::cli::CompanyArgs;
use crate::error::CliError;

use super::{source_error, CommandResult};

#[derive(Debug, Serialize)]
struct NewsResponseData {
    company: String,
    articles: Vec<NewsArticle>,
}

pub async fn run(args: &CompanyArgs, research: &ResearchClient) -> Result<CommandResult, CliError> {
    let company = args.query();
    let started = std::time::Instant::now();
    let outcome = research.latest_news(&company).await;
    let latency_ms = elapsed_ms(started);

    match outcome {
        Ok(articles) => {
            let data = serde_json::to_value(NewsResponseData { company, articles })?;
            Ok(CommandResult::ok(data, vec![ProviderId::Newsapi]).with_latency(latency_ms))
        }
        Err(ResearchError::Source(error)) => {
            Ok(CommandResult::ok(Value::Null, vec![ProviderId::Newsapi])
                .with_errors(vec![source_error(ProviderId::Newsapi, &error)?])
                .with_latency(latency_ms))
        }
        Err(ResearchError::Config(error)) => Err(error.into()),
        Err(error) => Err(CliError::Command(error.to_string())),
    }
}
