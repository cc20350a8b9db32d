//! Sequential multi-ticker fundamentals analysis.

use tracing::{info, warn};

use crate::data_source::FinancialsRequest;
use crate::fundamentals::{FundamentalsReport, TickerFailure};
use crate::routing::{SourceRouter, SourceStrategy};
use crate::{EnvelopeError, ProviderId, Symbol, UtcDateTime};

/// Result of a batch run: successes in input order plus per-ticker failures.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub reports: Vec<FundamentalsReport>,
    pub failures: Vec<TickerFailure>,
    pub source_chain: Vec<ProviderId>,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
}

impl BatchOutcome {
    pub fn has_successes(&self) -> bool {
        !self.reports.is_empty()
    }

    fn record_sources(&mut self, chain: &[ProviderId]) {
        for provider in chain {
            if !self.source_chain.contains(provider) {
                self.source_chain.push(*provider);
            }
        }
    }

    fn record_failure(&mut self, symbol: &str, code: &str, message: String) {
        warn!(symbol, "ticker skipped: {message}");
        self.warnings.push(format!("skipped '{symbol}': {message}"));
        self.errors.push(EnvelopeError {
            code: code.to_owned(),
            message: message.clone(),
            retryable: None,
            source: None,
            symbol: Some(symbol.to_owned()),
        });
        self.failures.push(TickerFailure {
            symbol: symbol.to_owned(),
            message,
        });
    }
}

/// Analyzes each ticker in turn; a failing ticker is recorded and the loop moves on.
///
/// Tickers are compared after normalization, so a repeat such as `aapl` after
/// `AAPL` is skipped with a warning.
pub async fn analyze_tickers<I, S>(
    router: &SourceRouter,
    tickers: I,
    strategy: &SourceStrategy,
    as_of: UtcDateTime,
) -> BatchOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut outcome = BatchOutcome::default();
    let mut seen = Vec::<Symbol>::new();

    for raw in tickers {
        let raw = raw.as_ref().trim();
        let symbol = match Symbol::parse(raw) {
            Ok(symbol) => symbol,
            Err(error) => {
                outcome.record_failure(raw, "validation.symbol", error.to_string());
                continue;
            }
        };
        if seen.contains(&symbol) {
            warn!(symbol = %symbol, "duplicate ticker skipped");
            outcome
                .warnings
                .push(format!("duplicate ticker '{raw}' skipped; {symbol} already analyzed"));
            continue;
        }
        seen.push(symbol.clone());

        let request = FinancialsRequest::new(symbol.clone()).with_end(as_of);
        match router.route_financials(&request, strategy.clone()).await {
            Ok(success) => {
                outcome.record_sources(&success.source_chain);
                outcome.warnings.extend(success.warnings);
                let report = FundamentalsReport::from_statements(&success.data, as_of);
                info!(
                    symbol = %symbol,
                    periods = report.table.rows.len(),
                    "fundamentals analyzed"
                );
                outcome.reports.push(report);
            }
            Err(failure) => {
                outcome.record_sources(&failure.source_chain);
                let code = failure
                    .errors
                    .last()
                    .map_or("source.no_candidate", |error| error.code.as_str())
                    .to_owned();
                outcome.record_failure(symbol.as_str(), &code, failure.summary());
            }
        }
    }

    outcome
}
