//! Provider adapters.
//!
//! | Adapter | Serves | Notes |
//! |---------|--------|-------|
//! | [`YahooAdapter`] | equity bars, crypto bars as `BASE-USD`, annual financials | no 4h bars |
//! | [`KucoinAdapter`] | crypto bars | first exchange tried; 1500 candles per call |
//! | [`KrakenAdapter`] | crypto bars | `XBT`/`XDG` asset codes normalized; 720 candles per call |
//! | [`CoinbaseAdapter`] | crypto bars | no 30m, 4h or 1w bars; 300 candles per call |

mod coinbase;
mod kraken;
mod kucoin;
mod yahoo;

#[cfg(test)]
pub(crate) mod test_support;

pub use coinbase::CoinbaseAdapter;
pub use kraken::KrakenAdapter;
pub use kucoin::KucoinAdapter;
pub use yahoo::YahooAdapter;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;

use crate::data_source::{BarsRequest, SourceError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{AssetClass, Bar, BarSeries, ProviderId, TradingPair, UtcDateTime, ValidationError};

/// Executes `request` and decodes a JSON body, mapping transport and status failures.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    http_client: &dyn HttpClient,
    provider: ProviderId,
    request: HttpRequest,
) -> Result<T, SourceError> {
    let response = http_client.execute(request).await.map_err(|e| {
        SourceError::unavailable(format!("{provider} transport error: {}", e.message()))
    })?;

    match response.status {
        status if (200..300).contains(&status) => {}
        429 => {
            return Err(SourceError::rate_limited(format!(
                "{provider} rate limit exceeded"
            )))
        }
        404 => {
            return Err(SourceError::not_found(format!(
                "{provider} returned status 404"
            )))
        }
        status => {
            return Err(SourceError::unavailable(format!(
                "{provider} returned status {status}"
            )))
        }
    }

    serde_json::from_str(&response.body)
        .map_err(|e| SourceError::internal(format!("failed to parse {provider} response: {e}")))
}

/// Exchange listing keyed by unified pair, loaded once per adapter.
#[derive(Debug, Default)]
pub(crate) struct MarketCache {
    markets: Mutex<Option<Arc<HashMap<TradingPair, String>>>>,
}

impl MarketCache {
    pub(crate) fn get(&self) -> Option<Arc<HashMap<TradingPair, String>>> {
        self.markets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn store(
        &self,
        markets: HashMap<TradingPair, String>,
    ) -> Arc<HashMap<TradingPair, String>> {
        let markets = Arc::new(markets);
        *self
            .markets
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&markets));
        markets
    }
}

/// Unified `BASE/USDT` pair for a crypto request; exchanges do not list equities.
pub(crate) fn crypto_pair(req: &BarsRequest) -> Result<TradingPair, SourceError> {
    match req.asset_class {
        AssetClass::Crypto => Ok(TradingPair::usdt(&req.symbol)),
        AssetClass::Equity => Err(SourceError::invalid_request(format!(
            "'{}' is an equity; exchanges only list crypto pairs",
            req.symbol
        ))),
    }
}

/// Splits the request window into consecutive spans of at most `per_call` candles.
pub(crate) fn candle_windows(req: &BarsRequest, per_call: i32) -> Vec<(UtcDateTime, UtcDateTime)> {
    let step = req.interval.duration() * per_call.max(1);
    let mut windows = Vec::new();
    let mut cursor = req.start;

    while cursor < req.end {
        let window_end = cursor.saturating_add(step).min(req.end);
        if window_end <= cursor {
            break;
        }
        windows.push((cursor, window_end));
        cursor = window_end;
    }
    windows
}

/// Sorted, de-duplicated series holding at most `req.limit()` bars, newest kept.
pub(crate) fn limited_series(req: BarsRequest, bars: Vec<Bar>) -> BarSeries {
    let limit = req.limit();
    let mut series = BarSeries::new(req.symbol, req.interval, bars);
    if series.bars.len() > limit {
        let excess = series.bars.len() - limit;
        series.bars.drain(..excess);
    }
    series
}

pub(crate) fn parse_number(raw: &str, field: &'static str) -> Result<f64, SourceError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| SourceError::internal(format!("invalid {field} value '{raw}'")))
}

pub(crate) fn validation_to_error(error: ValidationError) -> SourceError {
    SourceError::internal(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Interval, Symbol};

    fn hourly(days: u32) -> BarsRequest {
        BarsRequest::ending_at(
            Symbol::parse("BTC").expect("valid"),
            AssetClass::Crypto,
            Interval::OneHour,
            days,
            UtcDateTime::from_unix_seconds(1_700_006_400).expect("valid"),
        )
        .expect("valid request")
    }

    fn bar(seconds: i64) -> Bar {
        let ts = UtcDateTime::from_unix_seconds(seconds).expect("valid");
        Bar::new(ts, 1.0, 1.0, 1.0, 1.0, None).expect("valid bar")
    }

    #[test]
    fn windows_cover_request_without_gaps() {
        let req = hourly(90);
        let windows = candle_windows(&req, 1_500);

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].0, req.start);
        assert_eq!(windows[0].1, windows[1].0);
        assert_eq!(windows[1].1, req.end);
    }

    #[test]
    fn series_keeps_newest_bars_up_to_limit() {
        let req = hourly(1);
        let bars = (0..30).map(|n| bar(1_700_006_400 - n * 3_600)).collect();

        let series = limited_series(req, bars);

        assert_eq!(series.len(), 24);
        assert_eq!(series.bars[23].ts.unix_seconds(), 1_700_006_400);
    }
}
