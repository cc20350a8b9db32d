use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::{
    candle_windows, crypto_pair, fetch_json, limited_series, parse_number, validation_to_error,
    MarketCache,
};
use crate::data_source::{BarsRequest, CapabilitySet, DataSource, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{Bar, BarSeries, Interval, ProviderId, TradingPair, UtcDateTime};

const BASE_URL: &str = "https://api.kucoin.com";
const SUCCESS_CODE: &str = "200000";
const MAX_CANDLES_PER_CALL: i32 = 1_500;

/// KuCoin spot market adapter.
pub struct KucoinAdapter {
    http_client: Arc<dyn HttpClient>,
    timeout_ms: u64,
    markets: MarketCache,
}

impl KucoinAdapter {
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
        let request = HttpRequest::get(format!("{BASE_URL}/api/v2/symbols"))
            .with_timeout_ms(self.timeout_ms);
        let response: KucoinResponse<Vec<KucoinSymbol>> =
            fetch_json(self.http_client.as_ref(), ProviderId::Kucoin, request).await?;
        let symbols = response.into_data()?;

        let markets = symbols
            .into_iter()
            .filter(|symbol| symbol.enable_trading)
            .map(|symbol| {
                (
                    TradingPair::new(&symbol.base_currency, &symbol.quote_currency),
                    symbol.symbol,
                )
            })
            .collect::<HashMap<_, _>>();
        debug!(markets = markets.len(), "loaded kucoin markets");
        Ok(markets)
    }

    async fn fetch_bars(&self, req: BarsRequest) -> Result<BarSeries, SourceError> {
        let pair = crypto_pair(&req)?;
        let market_id = self.market_id(&pair).await?;

        let mut bars = Vec::new();
        for (start, end) in candle_windows(&req, MAX_CANDLES_PER_CALL) {
            let endpoint = format!(
                "{BASE_URL}/api/v1/market/candles?type={}&symbol={}&startAt={}&endAt={}",
                candle_type(req.interval),
                urlencoding::encode(&market_id),
                start.unix_seconds(),
                end.unix_seconds()
            );
            let request = HttpRequest::get(endpoint).with_timeout_ms(self.timeout_ms);
            let response: KucoinResponse<Vec<Vec<String>>> =
                fetch_json(self.http_client.as_ref(), ProviderId::Kucoin, request).await?;

            for row in &response.into_data()? {
                if let Some(bar) = normalize_candle(row)? {
                    bars.push(bar);
                }
            }
        }

        Ok(limited_series(req, bars))
    }
}

impl DataSource for KucoinAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Kucoin
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

const fn candle_type(interval: Interval) -> &'static str {
    match interval {
        Interval::OneMinute => "1min",
        Interval::FiveMinutes => "5min",
        Interval::FifteenMinutes => "15min",
        Interval::ThirtyMinutes => "30min",
        Interval::OneHour => "1hour",
        Interval::FourHours => "4hour",
        Interval::OneDay => "1day",
        Interval::OneWeek => "1week",
    }
}

/// Row layout: `[time, open, close, high, low, volume, turnover]`, all strings.
fn normalize_candle(row: &[String]) -> Result<Option<Bar>, SourceError> {
    let [time, open, close, high, low, volume, ..] = row else {
        return Err(SourceError::internal(format!(
            "kucoin candle has {} fields, expected 7",
            row.len()
        )));
    };

    let seconds = time
        .parse::<i64>()
        .map_err(|_| SourceError::internal(format!("invalid kucoin candle time '{time}'")))?;
    let ts = UtcDateTime::from_unix_seconds(seconds).map_err(validation_to_error)?;

    Ok(Bar::new(
        ts,
        parse_number(open, "open")?,
        parse_number(high, "high")?,
        parse_number(low, "low")?,
        parse_number(close, "close")?,
        Some(parse_number(volume, "volume")?),
    )
    .ok())
}

#[derive(Debug, Deserialize)]
struct KucoinResponse<T> {
    code: String,
    #[serde(default)]
    msg: Option<String>,
    data: Option<T>,
}

impl<T> KucoinResponse<T> {
    fn into_data(self) -> Result<T, SourceError> {
        if self.code != SUCCESS_CODE {
            let message = self.msg.unwrap_or_else(|| String::from("no message"));
            return Err(match self.code.as_str() {
                "429000" => SourceError::rate_limited(format!("kucoin: {message}")),
                "400100" => SourceError::invalid_request(format!("kucoin: {message}")),
                code => SourceError::unavailable(format!("kucoin error {code}: {message}")),
            });
        }

        self.data
            .ok_or_else(|| SourceError::internal("kucoin response has no data"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KucoinSymbol {
    symbol: String,
    base_currency: String,
    quote_currency: String,
    #[serde(default)]
    enable_trading: bool,
}
