use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{crypto_pair, fetch_json, limited_series, validation_to_error, MarketCache};
use crate::data_source::{BarsRequest, CapabilitySet, DataSource, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{Bar, BarSeries, Interval, ProviderId, TradingPair, UtcDateTime};

const BASE_URL: &str = "https://api.kraken.com";
const MAX_CANDLES_PER_CALL: usize = 720;

/// Kraken spot market adapter.
///
/// Kraken names some assets with legacy codes (`XBT` for bitcoin, `XDG` for
/// dogecoin); the listing is normalized so lookups use common tickers.
pub struct KrakenAdapter {
    http_client: Arc<dyn HttpClient>,
    timeout_ms: u64,
    markets: MarketCache,
}

impl KrakenAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, timeout_ms: u64) -> Self {
        Self {
            http_client,
            timeout_ms,
            markets: MarketCache::default(),
        }
    }

    async fn market_id(&self, pair: &TradingPair) -> Result<String, SourceError> {
        let markets = match self.markets.get() {
            Some(markets) => markets,
            None => self.markets.store(self.load_markets().await?),
        };

        markets
            .get(pair)
            .cloned()
            .ok_or_else(|| SourceError::symbol_not_listed(pair))
    }

    async fn load_markets(&self) -> Result<HashMap<TradingPair, String>, SourceError> {
        let request = HttpRequest::get(format!("{BASE_URL}/0/public/AssetPairs"))
            .with_timeout_ms(self.timeout_ms);
        let response: KrakenResponse<HashMap<String, KrakenAssetPair>> =
            fetch_json(self.http_client.as_ref(), ProviderId::Kraken, request).await?;

        let markets = response
            .into_result()?
            .into_values()
            .filter_map(|pair| {
                let wsname = pair.wsname?;
                let (base, quote) = wsname.split_once('/')?;
                Some((
                    TradingPair::new(normalize_asset(base), normalize_asset(quote)),
                    pair.altname,
                ))
            })
            .collect::<HashMap<_, _>>();
        debug!(markets = markets.len(), "loaded kraken markets");
        Ok(markets)
    }

    async fn fetch_bars(&self, req: BarsRequest) -> Result<BarSeries, SourceError> {
        let pair = crypto_pair(&req)?;
        let market_id = self.market_id(&pair).await?;

        let limit = req.limit();
        let end = req.end.unix_seconds();
        let mut since = req.start.unix_seconds();
        let mut bars = Vec::new();

        loop {
            let (rows, last) = self.fetch_ohlc(&market_id, req.interval, since).await?;
            let row_count = rows.len();
            bars.extend(
                rows.into_iter()
                    .filter(|bar| bar.ts >= req.start && bar.ts <= req.end),
            );

            match last {
                Some(last)
                    if row_count >= MAX_CANDLES_PER_CALL
                        && last > since
                        && last < end
                        && bars.len() < limit =>
                {
                    since = last;
                }
                _ => break,
            }
        }

        let expected_first = req.start.saturating_add(req.interval.duration());
        if bars.first().is_some_and(|bar| bar.ts > expected_first) {
            warn!(
                market = %market_id,
                bars = bars.len(),
                limit,
                "kraken history starts after the requested window"
            );
        }

        Ok(limited_series(req, bars))
    }

    /// One OHLC page starting at `since`, with the cursor for the next page.
    async fn fetch_ohlc(
        &self,
        market_id: &str,
        interval: Interval,
        since: i64,
    ) -> Result<(Vec<Bar>, Option<i64>), SourceError> {
        let endpoint = format!(
            "{BASE_URL}/0/public/OHLC?pair={}&interval={}&since={since}",
            urlencoding::encode(market_id),
            interval_minutes(interval),
        );
        let request = HttpRequest::get(endpoint).with_timeout_ms(self.timeout_ms);
        let response: KrakenResponse<HashMap<String, Value>> =
            fetch_json(self.http_client.as_ref(), ProviderId::Kraken, request).await?;

        let mut result = response.into_result()?;
        let last = result.remove("last").and_then(|last| last.as_i64());
        let rows = result
            .into_values()
            .next()
            .unwrap_or(Value::Array(Vec::new()));
        let rows: Vec<Vec<Value>> = serde_json::from_value(rows)
            .map_err(|e| SourceError::internal(format!("failed to parse kraken OHLC rows: {e}")))?;

        let mut bars = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(bar) = normalize_candle(row)? {
                bars.push(bar);
            }
        }
        Ok((bars, last))
    }
}

impl DataSource for KrakenAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Kraken
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::bars_only()
    }

    fn intervals(&self) -> &'static [Interval] {
        &Interval::ALL
    }

    fn bars<'a>(&'a self, req: BarsRequest) -> SourceFuture<'a, BarSeries> {
        Box::pin(self.fetch_bars(req))
    }
}

fn normalize_asset(code: &str) -> &str {
    match code {
        "XBT" => "BTC",
        "XDG" => "DOGE",
        other => other,
    }
}

const fn interval_minutes(interval: Interval) -> u64 {
    interval.seconds() / 60
}

/// Row layout: `[time, open, high, low, close, vwap, volume, count]`; prices are strings.
fn normalize_candle(row: &[Value]) -> Result<Option<Bar>, SourceError> {
    let [time, open, high, low, close, _vwap, volume, ..] = row else {
        return Err(SourceError::internal(format!(
            "kraken candle has {} fields, expected 8",
            row.len()
        )));
    };

    let seconds = time
        .as_i64()
        .ok_or_else(|| SourceError::internal("kraken candle time is not an integer"))?;
    let ts = UtcDateTime::from_unix_seconds(seconds).map_err(validation_to_error)?;

    Ok(Bar::new(
        ts,
        value_number(open, "open")?,
        value_number(high, "high")?,
        value_number(low, "low")?,
        value_number(close, "close")?,
        Some(value_number(volume, "volume")?),
    )
    .ok())
}

fn value_number(value: &Value, field: &'static str) -> Result<f64, SourceError> {
    match value {
        Value::String(raw) => super::parse_number(raw, field),
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| SourceError::internal(format!("invalid {field} value"))),
        _ => Err(SourceError::internal(format!("invalid {field} value"))),
    }
}

#[derive(Debug, Deserialize)]
struct KrakenResponse<T> {
    #[serde(default)]
    error: Vec<String>,
    result: Option<T>,
}

impl<T> KrakenResponse<T> {
    fn into_result(self) -> Result<T, SourceError> {
        if let Some(first) = self.error.first() {
            let message = self.error.join(", ");
            return Err(if first.starts_with("EQuery:Unknown asset pair") {
                SourceError::not_found(format!("kraken: {message}"))
            } else if first.contains("Rate limit") {
                SourceError::rate_limited(format!("kraken: {message}"))
            } else {
                SourceError::unavailable(format!("kraken: {message}"))
            });
        }

        self.result
            .ok_or_else(|| SourceError::internal("kraken response has no result"))
    }
}

#[derive(Debug, Deserialize)]
struct KrakenAssetPair {
    altname: String,
    #[serde(default)]
    wsname: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::{block_on, ScriptedHttpClient};
    use crate::data_source::SourceErrorKind;
    use crate::{AssetClass, Symbol};

    const PAIRS: &str = r#"{"error":[],"result":{
        "XBTUSDT":{"altname":"XBTUSDT","wsname":"XBT/USDT","base":"XXBT","quote":"USDT"},
        "XDGUSDT":{"altname":"XDGUSDT","wsname":"XDG/USDT","base":"XXDG","quote":"USDT"},
        "ETHUSDT":{"altname":"ETHUSDT","wsname":"ETH/USDT","base":"XETH","quote":"USDT"}
    }}"#;

    fn ohlc(first_ts: i64) -> String {
        format!(
            r#"{{"error":[],"result":{{"XBTUSDT":[
                [{first_ts},"100.0","101.0","99.0","100.5","100.2","3.1",12],
                [{},"100.5","102.0","100.0","101.5","101.0","2.4",9]
            ],"last":{}}}}}"#,
            first_ts + 3_600,
            first_ts + 3_600
        )
    }

    fn request(symbol: &str) -> BarsRequest {
        BarsRequest::ending_at(
            Symbol::parse(symbol).expect("valid"),
            AssetClass::Crypto,
            Interval::OneHour,
            1,
            UtcDateTime::from_unix_seconds(1_700_050_000).expect("valid"),
        )
        .expect("valid request")
    }

    #[test]
    fn resolves_legacy_bitcoin_code() {
        let client = Arc::new(
            ScriptedHttpClient::new()
                .on("/AssetPairs", 200, PAIRS)
                .on("/OHLC", 200, &ohlc(1_700_000_000)),
        );
        let adapter = KrakenAdapter::new(client.clone(), 1_000);

        let series = block_on(adapter.bars(request("BTC"))).expect("bars");

        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[1].close, 101.5);
        let ohlc_request = &client.recorded_requests()[1];
        assert!(ohlc_request.url.contains("pair=XBTUSDT"));
        assert!(ohlc_request.url.contains("interval=60"));
    }

    #[test]
    fn drops_rows_outside_window() {
        let client = Arc::new(
            ScriptedHttpClient::new()
                .on("/AssetPairs", 200, PAIRS)
                .on("/OHLC", 200, &ohlc(1_699_900_000)),
        );
        let adapter = KrakenAdapter::new(client, 1_000);

        let series = block_on(adapter.bars(request("BTC"))).expect("bars");
        assert!(series.is_empty());
    }

    fn ohlc_page(first_ts: i64, count: i64) -> String {
        let rows = (0..count)
            .map(|n| format!(r#"[{},"100.0","101.0","99.0","100.5","100.2","3.1",12]"#, first_ts + n * 3_600))
            .collect::<Vec<_>>()
            .join(",");
        let last = first_ts + (count - 1) * 3_600;
        format!(r#"{{"error":[],"result":{{"XBTUSDT":[{rows}],"last":{last}}}}}"#)
    }

    #[test]
    fn full_pages_continue_from_last_cursor() {
        let first_ts = 1_694_869_200;
        let second_ts = first_ts + 720 * 3_600;
        let client = Arc::new(
            ScriptedHttpClient::new()
                .on("/AssetPairs", 200, PAIRS)
                .on("/OHLC", 200, &ohlc_page(first_ts, 720))
                .on("/OHLC", 200, &ohlc_page(second_ts, 2)),
        );
        let adapter = KrakenAdapter::new(client.clone(), 1_000);
        let request = BarsRequest::ending_at(
            Symbol::parse("BTC").expect("valid"),
            AssetClass::Crypto,
            Interval::OneHour,
            60,
            UtcDateTime::from_unix_seconds(1_700_050_000).expect("valid"),
        )
        .expect("valid request");

        let series = block_on(adapter.bars(request)).expect("bars");

        assert_eq!(series.len(), 722);
        assert_eq!(client.count_matching("/OHLC"), 2);
        let cursor = first_ts + 719 * 3_600;
        assert!(client.recorded_requests()[2]
            .url
            .ends_with(&format!("since={cursor}")));
    }

    #[test]
    fn unlisted_pair_reports_symbol_not_listed() {
        let client = Arc::new(ScriptedHttpClient::new().on("/AssetPairs", 200, PAIRS));
        let adapter = KrakenAdapter::new(client, 1_000);

        let error = block_on(adapter.bars(request("XRP"))).expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::SymbolNotListed);
    }

    #[test]
    fn api_errors_are_surfaced() {
        let client = Arc::new(ScriptedHttpClient::new().on(
            "/AssetPairs",
            200,
            r#"{"error":["EGeneral:Temporary lockout"]}"#,
        ));
        let adapter = KrakenAdapter::new(client, 1_000);

        let error = block_on(adapter.bars(request("BTC"))).expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert!(error.message().contains("Temporary lockout"));
    }
}
