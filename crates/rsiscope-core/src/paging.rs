//! Chunked retrieval for long windows of sub-hour bars.
//!
//! Providers cap how many fine-grained bars a single call returns, so windows
//! longer than [`CHUNK_DAYS`] are walked forward one chunk at a time and the
//! pieces are stitched into one series.

use time::Duration;
use tracing::debug;

use crate::data_source::{BarsRequest, DataSource, SourceError, SourceFuture};
use crate::{BarSeries, UtcDateTime};

/// Maximum window, in days, requested per call for sub-hour intervals.
pub const CHUNK_DAYS: i64 = 5;

/// Splits `[start, end]` into consecutive windows of at most [`CHUNK_DAYS`].
pub fn chunk_windows(start: UtcDateTime, end: UtcDateTime) -> Vec<(UtcDateTime, UtcDateTime)> {
    let step = Duration::days(CHUNK_DAYS);
    let mut windows = Vec::new();
    let mut cursor = start;

    while cursor < end {
        let next = cursor.saturating_add(step).min(end);
        if next <= cursor {
            break;
        }
        windows.push((cursor, next));
        cursor = next;
    }

    windows
}

/// Fetches bars for `req` from `source`, chunking fine-grained long windows.
///
/// Bars repeated across chunk boundaries are kept once.
pub fn fetch_bars<'a>(source: &'a dyn DataSource, req: BarsRequest) -> SourceFuture<'a, BarSeries> {
    Box::pin(async move {
        if !source.supports_interval(req.interval) {
            return Err(SourceError::unsupported_interval(req.interval));
        }

        if !req.interval.is_fine_grained() || req.span() <= Duration::days(CHUNK_DAYS) {
            return source.bars(req).await;
        }

        let windows = chunk_windows(req.start, req.end);
        debug!(
            source = %source.id(),
            symbol = %req.symbol,
            interval = %req.interval,
            chunks = windows.len(),
            "fetching bars in chunks"
        );

        let mut series = BarSeries::new(req.symbol.clone(), req.interval, Vec::new());
        for (start, end) in windows {
            let chunk = source.bars(req.with_window(start, end)).await?;
            series.extend_after_last(chunk.bars);
        }

        Ok(series)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> UtcDateTime {
        UtcDateTime::parse(raw).expect("timestamp")
    }

    #[test]
    fn windows_cover_range_without_gaps() {
        let windows = chunk_windows(ts("2024-01-01T00:00:00Z"), ts("2024-01-13T00:00:00Z"));

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].0, ts("2024-01-01T00:00:00Z"));
        assert_eq!(windows[1].0, windows[0].1);
        assert_eq!(windows[2].1, ts("2024-01-13T00:00:00Z"));
    }

    #[test]
    fn exact_multiple_produces_no_empty_tail() {
        let windows = chunk_windows(ts("2024-01-01T00:00:00Z"), ts("2024-01-11T00:00:00Z"));
        assert_eq!(windows.len(), 2);
    }

    #[test]
    fn empty_range_has_no_windows() {
        let at = ts("2024-01-01T00:00:00Z");
        assert!(chunk_windows(at, at).is_empty());
    }
}
