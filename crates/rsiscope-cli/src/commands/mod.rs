mod forecast;
mod fundamentals;
mod insights;
mod news;
mod rsi;
mod sources;

use std::sync::Arc;

use rsiscope_core::{
    AppConfig, AssetClass, Envelope, EnvelopeError, HttpClient, ProviderId, ReqwestHttpClient,
    ResearchClient, SourceError, SourceRouter, SourceStrategy,
};
use serde_json::Value;

use crate::cli::{AssetArg, Cli, Command, SourceSelector};
use crate::error::CliError;
use crate::metadata::Metadata;

const SCHEMA_VERSION: &str = "v1.0.0";

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub source_chain: Vec<ProviderId>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            source_chain,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Failed attempts that preceded a successful fallback are reported as warnings.
    pub fn with_recovered_errors(self, errors: &[EnvelopeError]) -> Self {
        let warnings = errors
            .iter()
            .map(|error| match error.source {
                Some(source) => format!("{source}: {} ({})", error.message, error.code),
                None => format!("{} ({})", error.message, error.code),
            })
            .collect();
        self.with_warnings(warnings)
    }
}

/// Router and research client shared by every command.
pub struct CommandContext {
    pub router: SourceRouter,
    pub research: ResearchClient,
}

impl CommandContext {
    pub fn new(router: SourceRouter, research: ResearchClient) -> Self {
        Self { router, research }
    }

    /// Live providers configured from the environment and global flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut config = AppConfig::from_env()?;
        if let Some(timeout_ms) = cli.timeout_ms {
            config = config.with_timeout_ms(timeout_ms);
        }

        let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
        let router = SourceRouter::with_http_client(Arc::clone(&http_client), config.timeout_ms);
        Ok(Self::new(router, ResearchClient::new(http_client, config)))
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let context = CommandContext::from_cli(cli)?;
    execute(cli, &context).await
}

/// Dispatches the parsed command and wraps its result in an envelope.
pub async fn execute(cli: &Cli, context: &CommandContext) -> Result<Envelope<Value>, CliError> {
    let router = &context.router;
    let strategy = to_source_strategy(cli.source);
    tracing::debug!(source = ?cli.source, command = ?cli.command, "dispatching command");

    let command_result = match &cli.command {
        Command::Rsi(args) => rsi::run(args, router, &strategy).await?,
        Command::Fundamentals(args) => fundamentals::run(args, router, &strategy).await?,
        Command::Forecast(args) => forecast::run(args, router, &strategy).await?,
        Command::News(args) => news::run(args, &context.research).await?,
        Command::Insights(args) => insights::run(args, &context.research).await?,
        Command::Sources(args) => sources::run(args, router, &strategy)?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
        latency_ms,
        source_chain,
    } = command_result;

    let mut metadata = Metadata::new(source_chain, latency_ms)?;
    for warning in warnings {
        metadata.push_warning(warning);
    }

    let meta = metadata.into_envelope_meta(SCHEMA_VERSION)?;
    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

fn to_source_strategy(source: SourceSelector) -> SourceStrategy {
    match source {
        SourceSelector::Auto => SourceStrategy::Auto,
        SourceSelector::Yahoo => SourceStrategy::Strict(ProviderId::Yahoo),
        SourceSelector::Kucoin => SourceStrategy::Strict(ProviderId::Kucoin),
        SourceSelector::Kraken => SourceStrategy::Strict(ProviderId::Kraken),
        SourceSelector::Coinbase => SourceStrategy::Strict(ProviderId::Coinbase),
    }
}

pub(crate) fn to_asset_class(asset: AssetArg) -> AssetClass {
    match asset {
        AssetArg::Stock => AssetClass::Equity,
        AssetArg::Crypto => AssetClass::Crypto,
    }
}

pub(crate) fn source_error(
    provider: ProviderId,
    error: &SourceError,
) -> Result<EnvelopeError, CliError> {
    Ok(EnvelopeError::new(error.code(), error.message())?
        .with_retryable(error.retryable())
        .with_source(provider))
}
