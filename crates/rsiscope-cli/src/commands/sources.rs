use serde::Serialize;

use rsiscope_core::{AssetClass, Endpoint, Interval, ProviderId, SourceRouter, SourceStrategy};

use crate::cli::SourcesArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SourceStatus {
    id: ProviderId,
    capabilities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intervals: Option<&'static [Interval]>,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    stock_chain: Vec<ProviderId>,
    crypto_chain: Vec<ProviderId>,
    sources: Vec<SourceStatus>,
}

pub fn run(
    args: &SourcesArgs,
    router: &SourceRouter,
    strategy: &SourceStrategy,
) -> Result<CommandResult, CliError> {
    let sources = router
        .snapshots()
        .into_iter()
        .map(|snapshot| SourceStatus {
            id: snapshot.id,
            capabilities: snapshot.capabilities.supported_endpoints(),
            intervals: args.verbose.then_some(snapshot.intervals),
        })
        .collect::<Vec<_>>();

    let stock_chain =
        router.source_chain_for_strategy(Endpoint::Bars, AssetClass::Equity, strategy);
    let crypto_chain =
        router.source_chain_for_strategy(Endpoint::Bars, AssetClass::Crypto, strategy);
    let source_chain = sources.iter().map(|source| source.id).collect();

    let data = serde_json::to_value(SourcesResponseData {
        stock_chain,
        crypto_chain,
        sources,
    })?;

    Ok(CommandResult::ok(data, source_chain))
}
