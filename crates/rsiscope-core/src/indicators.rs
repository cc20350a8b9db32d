//! Technical indicators over closing prices.

use serde::{Deserialize, Serialize};

use crate::{PriceSeries, UtcDateTime, ValidationError};

/// Conventional RSI lookback.
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Window of the moving-average price projection.
pub const FORECAST_WINDOW: usize = 5;

/// Trailing simple mean; the first `window - 1` entries are undefined.
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<Option<f64>>, ValidationError> {
    if window == 0 {
        return Err(ValidationError::ZeroPeriod);
    }

    let mut output = vec![None; values.len()];
    if values.len() < window {
        return Ok(output);
    }

    let mut sum = values[..window].iter().sum::<f64>();
    output[window - 1] = Some(sum / window as f64);
    for i in window..values.len() {
        sum += values[i] - values[i - window];
        output[i] = Some(sum / window as f64);
    }

    Ok(output)
}

/// Relative Strength Index, aligned index-for-index with `prices`.
///
/// The first price has a change of zero. Gains and losses are averaged with a
/// simple trailing mean over `period`, so the first `period - 1` entries are
/// `None`. A window with no losses scores 100.
pub fn rsi(prices: &[f64], period: usize) -> Result<Vec<Option<f64>>, ValidationError> {
    if period == 0 {
        return Err(ValidationError::ZeroPeriod);
    }

    let mut gains = Vec::with_capacity(prices.len());
    let mut losses = Vec::with_capacity(prices.len());
    for (i, price) in prices.iter().enumerate() {
        let change = if i == 0 { 0.0 } else { price - prices[i - 1] };
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let avg_gains = rolling_mean(&gains, period)?;
    let avg_losses = rolling_mean(&losses, period)?;

    Ok(avg_gains
        .into_iter()
        .zip(avg_losses)
        .map(|(gain, loss)| match (gain, loss) {
            (Some(gain), Some(loss)) => Some(rsi_from_averages(gain, loss)),
            _ => None,
        })
        .collect())
}

fn rsi_from_averages(gain: f64, loss: f64) -> f64 {
    // Rolling sums can leave a tiny negative residue.
    if loss <= f64::EPSILON {
        return 100.0;
    }
    let rs = gain.max(0.0) / loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

/// One row of the price + RSI table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiPoint {
    pub ts: UtcDateTime,
    pub price: f64,
    pub rsi: Option<f64>,
}

/// Computes RSI over a price series and pairs each value with its observation.
pub fn rsi_table(series: &PriceSeries, period: usize) -> Result<Vec<RsiPoint>, ValidationError> {
    let values = rsi(&series.prices(), period)?;
    Ok(series
        .points()
        .iter()
        .zip(values)
        .map(|(point, rsi)| RsiPoint {
            ts: point.ts,
            price: point.price,
            rsi,
        })
        .collect())
}

/// Next-period projection: the latest [`FORECAST_WINDOW`]-period moving average.
pub fn moving_average_forecast(prices: &[f64]) -> Option<f64> {
    rolling_mean(prices, FORECAST_WINDOW)
        .ok()?
        .last()
        .copied()
        .flatten()
}
