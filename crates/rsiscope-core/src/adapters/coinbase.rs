use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::{
    candle_windows, crypto_pair, fetch_json, limited_series, validation_to_error, MarketCache,
};
use crate::data_source::{BarsRequest, CapabilitySet, DataSource, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{Bar, BarSeries, Interval, ProviderId, TradingPair, UtcDateTime};

const BASE_URL: &str = "https://api.exchange.coinbase.com";
const MAX_CANDLES_PER_CALL: i32 = 300;

const INTERVALS: [Interval; 5] = [
    Interval::OneMinute,
    Interval::FiveMinutes,
    Interval::FifteenMinutes,
    Interval::OneHour,
    Interval::OneDay,
];

/// Coinbase Exchange adapter.
pub struct CoinbaseAdapter {
    http_client: Arc<dyn HttpClient>,
    timeout_ms: u64,
    markets: MarketCache,
}

impl CoinbaseAdapter {
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
        let request =
            HttpRequest::get(format!("{BASE_URL}/products")).with_timeout_ms(self.timeout_ms);
        let products: Vec<CoinbaseProduct> =
            fetch_json(self.http_client.as_ref(), ProviderId::Coinbase, request).await?;

        let markets = products
            .into_iter()
            .filter(|product| !product.trading_disabled && product.status == "online")
            .map(|product| {
                (
                    TradingPair::new(&product.base_currency, &product.quote_currency),
                    product.id,
                )
            })
            .collect::<HashMap<_, _>>();
        debug!(markets = markets.len(), "loaded coinbase markets");
        Ok(markets)
    }

    async fn fetch_bars(&self, req: BarsRequest) -> Result<BarSeries, SourceError> {
        let pair = crypto_pair(&req)?;
        if !INTERVALS.contains(&req.interval) {
            return Err(SourceError::unsupported_interval(req.interval));
        }
        let product_id = self.market_id(&pair).await?;

        let granularity = req.interval.seconds();
        let mut bars = Vec::new();

        for (start, end) in candle_windows(&req, MAX_CANDLES_PER_CALL) {
            let endpoint = format!(
                "{BASE_URL}/products/{}/candles?granularity={granularity}&start={}&end={}",
                urlencoding::encode(&product_id),
                urlencoding::encode(&start.format_rfc3339()),
                urlencoding::encode(&end.format_rfc3339())
            );
            let request = HttpRequest::get(endpoint).with_timeout_ms(self.timeout_ms);
            let rows: Vec<Vec<f64>> =
                fetch_json(self.http_client.as_ref(), ProviderId::Coinbase, request).await?;

            for row in &rows {
                if let Some(bar) = normalize_candle(row)? {
                    bars.push(bar);
                }
            }
        }

        Ok(limited_series(req, bars))
    }
}

impl DataSource for CoinbaseAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Coinbase
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::bars_only()
    }

    fn intervals(&self) -> &'static [Interval] {
        &INTERVALS
    }

    fn bars<'a>(&'a self, req: BarsRequest) -> SourceFuture<'a, BarSeries> {
        Box::pin(self.fetch_bars(req))
    }
}

/// Row layout: `[time, low, high, open, close, volume]`.
fn normalize_candle(row: &[f64]) -> Result<Option<Bar>, SourceError> {
    let [time, low, high, open, close, volume, ..] = row else {
        return Err(SourceError::internal(format!(
            "coinbase candle has {} fields, expected 6",
            row.len()
        )));
    };

    let ts = UtcDateTime::from_unix_seconds(*time as i64).map_err(validation_to_error)?;
    Ok(Bar::new(ts, *open, *high, *low, *close, Some(*volume)).ok())
}

#[derive(Debug, Deserialize)]
struct CoinbaseProduct {
    id: String,
    base_currency: String,
    quote_currency: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    trading_disabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::{block_on, ScriptedHttpClient};
    use crate::data_source::SourceErrorKind;
    use crate::{AssetClass, Symbol};

    const PRODUCTS: &str = r#"[
        {"id":"ETH-USDT","base_currency":"ETH","quote_currency":"USDT","status":"online","trading_disabled":false},
        {"id":"ETH-USD","base_currency":"ETH","quote_currency":"USD","status":"online","trading_disabled":false}
    ]"#;

    const CANDLES: &str = "[[1700003600,1990,2010,2000,2005,12.5],[1700000000,1980,2001,1985,2000,10.0]]";

    fn request(interval: Interval, days: u32) -> BarsRequest {
        BarsRequest::ending_at(
            Symbol::parse("ETH").expect("valid"),
            AssetClass::Crypto,
            interval,
            days,
            UtcDateTime::from_unix_seconds(1_700_010_000).expect("valid"),
        )
        .expect("valid request")
    }

    #[test]
    fn parses_candles_and_targets_usdt_product() {
        let client = Arc::new(
            ScriptedHttpClient::new()
                .on("/products/ETH-USDT/candles", 200, CANDLES)
                .on("/products", 200, PRODUCTS),
        );
        let adapter = CoinbaseAdapter::new(client.clone(), 1_000);

        let series = block_on(adapter.bars(request(Interval::OneHour, 1))).expect("bars");

        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[0].open, 1985.0);
        assert_eq!(client.count_matching("granularity=3600"), 1);
    }

    #[test]
    fn splits_windows_beyond_candle_cap() {
        let client = Arc::new(
            ScriptedHttpClient::new()
                .on("/products/ETH-USDT/candles", 200, "[]")
                .on("/products", 200, PRODUCTS),
        );
        let adapter = CoinbaseAdapter::new(client.clone(), 1_000);

        // 30 days of hourly bars is 720 candles, three calls of at most 300.
        block_on(adapter.bars(request(Interval::OneHour, 30))).expect("bars");
        assert_eq!(client.count_matching("/candles"), 3);
    }

    #[test]
    fn four_hour_bars_are_unsupported() {
        let adapter = CoinbaseAdapter::new(Arc::new(ScriptedHttpClient::new()), 1_000);
        assert!(!adapter.supports_interval(Interval::FourHours));

        let error =
            block_on(adapter.bars(request(Interval::FourHours, 30))).expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::UnsupportedInterval);
    }
}
