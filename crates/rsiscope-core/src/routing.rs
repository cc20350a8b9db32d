use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::adapters::{CoinbaseAdapter, KrakenAdapter, KucoinAdapter, YahooAdapter};
use crate::data_source::{
    BarsRequest, CapabilitySet, DataSource, Endpoint, FinancialsRequest, SourceError, SourceFuture,
};
use crate::http_client::HttpClient;
use crate::{paging, AssetClass, BarSeries, EnvelopeError, FinancialStatements, Interval, ProviderId};

/// Source selection strategy for routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStrategy {
    Auto,
    Priority(Vec<ProviderId>),
    Strict(ProviderId),
}

impl SourceStrategy {
    fn is_strict(&self) -> bool {
        matches!(self, Self::Strict(_))
    }
}

/// Successful routed call.
#[derive(Debug, Clone)]
pub struct RouteSuccess<T> {
    pub data: T,
    pub selected_source: ProviderId,
    pub source_chain: Vec<ProviderId>,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
}

/// Failed routed call after exhausting candidates.
#[derive(Debug, Clone)]
pub struct RouteFailure {
    pub source_chain: Vec<ProviderId>,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
}

impl RouteFailure {
    /// One-line summary of every attempt, in chain order.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|error| match error.source {
                Some(source) => format!("{source}: {}", error.message),
                None => error.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

pub type RouteResult<T> = Result<RouteSuccess<T>, RouteFailure>;

/// Payloads the router can judge empty; an empty answer falls through to the next source.
pub trait RoutePayload {
    fn is_empty_payload(&self) -> bool;
}

impl RoutePayload for BarSeries {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

impl RoutePayload for FinancialStatements {
    fn is_empty_payload(&self) -> bool {
        self.balance_sheet.periods.is_empty()
    }
}

/// Source snapshot used by the `sources` CLI command.
#[derive(Debug, Clone, Copy)]
pub struct SourceSnapshot {
    pub id: ProviderId,
    pub capabilities: CapabilitySet,
    pub intervals: &'static [Interval],
}

/// Adapter registry and routing engine.
pub struct SourceRouter {
    adapters: HashMap<ProviderId, Arc<dyn DataSource>>,
}

impl SourceRouter {
    pub fn new(adapters: Vec<Arc<dyn DataSource>>) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.id(), adapter))
            .collect();
        Self { adapters }
    }

    /// Registers every built-in market data adapter on a shared transport.
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, timeout_ms: u64) -> Self {
        Self::new(vec![
            Arc::new(YahooAdapter::new(Arc::clone(&http_client), timeout_ms)),
            Arc::new(KucoinAdapter::new(Arc::clone(&http_client), timeout_ms)),
            Arc::new(KrakenAdapter::new(Arc::clone(&http_client), timeout_ms)),
            Arc::new(CoinbaseAdapter::new(http_client, timeout_ms)),
        ])
    }

    /// Ordered candidates for a request, before any attempt is made.
    pub fn source_chain_for_strategy(
        &self,
        endpoint: Endpoint,
        asset_class: AssetClass,
        strategy: &SourceStrategy,
    ) -> Vec<ProviderId> {
        let chain = self.plan_sources(endpoint, asset_class, strategy);
        if chain.is_empty() {
            return default_chain(endpoint, asset_class);
        }
        chain
    }

    pub fn snapshots(&self) -> Vec<SourceSnapshot> {
        ProviderId::MARKET_DATA
            .into_iter()
            .filter_map(|id| {
                self.adapters.get(&id).map(|adapter| SourceSnapshot {
                    id,
                    capabilities: adapter.capabilities(),
                    intervals: adapter.intervals(),
                })
            })
            .collect()
    }

    pub async fn route_bars(
        &self,
        req: &BarsRequest,
        strategy: SourceStrategy,
    ) -> RouteResult<BarSeries> {
        let asset_class = req.asset_class;
        let req = req.clone();
        self.route_endpoint(Endpoint::Bars, asset_class, strategy, move |source| {
            paging::fetch_bars(source, req.clone())
        })
        .await
    }

    pub async fn route_financials(
        &self,
        req: &FinancialsRequest,
        strategy: SourceStrategy,
    ) -> RouteResult<FinancialStatements> {
        let req = req.clone();
        self.route_endpoint(Endpoint::Financials, AssetClass::Equity, strategy, move |source| {
            source.financials(req.clone())
        })
        .await
    }

    async fn route_endpoint<T, F>(
        &self,
        endpoint: Endpoint,
        asset_class: AssetClass,
        strategy: SourceStrategy,
        mut invoke: F,
    ) -> RouteResult<T>
    where
        T: RoutePayload,
        F: for<'a> FnMut(&'a dyn DataSource) -> SourceFuture<'a, T>,
    {
        let started = Instant::now();
        let planned_chain = self.plan_sources(endpoint, asset_class, &strategy);
        let mut source_chain = Vec::with_capacity(planned_chain.len());
        let mut errors = Vec::new();

        for provider in planned_chain {
            source_chain.push(provider);

            let attempt = match self.adapters.get(&provider) {
                None => Err(SourceError::adapter_not_registered(provider)),
                Some(adapter) if !adapter.capabilities().supports(endpoint) => {
                    Err(SourceError::unsupported_endpoint(endpoint))
                }
                Some(adapter) => match invoke(adapter.as_ref()).await {
                    Ok(data) if data.is_empty_payload() => Err(SourceError::not_found(format!(
                        "source returned no {endpoint} data"
                    ))),
                    other => other,
                },
            };

            match attempt {
                Ok(data) => {
                    let mut warnings = Vec::new();
                    if !errors.is_empty() {
                        warnings.push(format!(
                            "source fallback succeeded with '{}' after {} failed attempt(s)",
                            provider.as_str(),
                            errors.len()
                        ));
                    }
                    info!(source = %provider, %endpoint, attempts = source_chain.len(), "source selected");

                    return Ok(RouteSuccess {
                        data,
                        selected_source: provider,
                        source_chain,
                        warnings,
                        errors,
                        latency_ms: elapsed_ms(started),
                    });
                }
                Err(error) => {
                    warn!(source = %provider, %endpoint, code = error.code(), "source attempt failed: {}", error.message());
                    errors.push(to_envelope_error(provider, error));
                    if strategy.is_strict() {
                        break;
                    }
                }
            }
        }

        if source_chain.is_empty() {
            source_chain = default_chain(endpoint, asset_class);
        }

        if errors.is_empty() {
            errors.push(no_candidate_error(endpoint));
        }

        Err(RouteFailure {
            source_chain,
            warnings: vec![format!("all sources failed for endpoint '{endpoint}'")],
            errors,
            latency_ms: elapsed_ms(started),
        })
    }

    fn plan_sources(
        &self,
        endpoint: Endpoint,
        asset_class: AssetClass,
        strategy: &SourceStrategy,
    ) -> Vec<ProviderId> {
        match strategy {
            SourceStrategy::Auto => default_chain(endpoint, asset_class)
                .into_iter()
                .filter(|provider| {
                    self.adapters
                        .get(provider)
                        .is_some_and(|adapter| adapter.capabilities().supports(endpoint))
                })
                .collect(),
            SourceStrategy::Priority(priority) => dedupe_chain(priority),
            SourceStrategy::Strict(provider) => vec![*provider],
        }
    }
}

/// Built-in fallback order: exchanges first for crypto bars, then the stock provider.
pub fn default_chain(endpoint: Endpoint, asset_class: AssetClass) -> Vec<ProviderId> {
    match (endpoint, asset_class) {
        (Endpoint::Bars, AssetClass::Crypto) => {
            let mut chain = ProviderId::EXCHANGES.to_vec();
            chain.push(ProviderId::Yahoo);
            chain
        }
        _ => vec![ProviderId::Yahoo],
    }
}

fn dedupe_chain(chain: &[ProviderId]) -> Vec<ProviderId> {
    let mut seen = HashSet::new();
    chain
        .iter()
        .copied()
        .filter(|provider| seen.insert(*provider))
        .collect()
}

fn to_envelope_error(provider: ProviderId, error: SourceError) -> EnvelopeError {
    EnvelopeError {
        code: error.code().to_owned(),
        message: error.message().to_owned(),
        retryable: Some(error.retryable()),
        source: Some(provider),
        symbol: None,
    }
}

fn no_candidate_error(endpoint: Endpoint) -> EnvelopeError {
    EnvelopeError {
        code: String::from("source.no_candidate"),
        message: format!("no source candidates available for endpoint '{endpoint}'"),
        retryable: Some(false),
        source: None,
        symbol: None,
    }
}

/// Milliseconds since `started`, saturating at `u64::MAX`.
pub fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
