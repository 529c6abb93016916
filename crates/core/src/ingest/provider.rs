use crate::domain::symbol::TickerSymbol;
use crate::ingest::types::{DailyBar, InfoFields};
use anyhow::Result;

/// Market data source. Every accessor is independently fallible; callers treat a failure
/// in one as a missing value, not as a failure of the ticker.
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Cheap current-price lookup. `Ok(None)` when the vendor has no value.
    async fn fast_price(&self, ticker: &TickerSymbol) -> Result<Option<f64>>;

    async fn info(&self, ticker: &TickerSymbol) -> Result<InfoFields>;

    /// Up to `sessions` most recent daily bars, oldest first.
    async fn history(&self, ticker: &TickerSymbol, sessions: usize) -> Result<Vec<DailyBar>>;
}

/// Keeps the newest `sessions` bars of an oldest-first series.
pub(crate) fn keep_latest(mut bars: Vec<DailyBar>, sessions: usize) -> Vec<DailyBar> {
    if bars.len() > sessions {
        bars.drain(..bars.len() - sessions);
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn keep_latest_drops_oldest_bars() {
        let bars: Vec<_> = (1..=5)
            .map(|d| DailyBar {
                date: NaiveDate::from_ymd_opt(2026, 3, d).unwrap(),
                close: d as f64,
                volume: 1.0,
            })
            .collect();
        let kept = keep_latest(bars.clone(), 3);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].close, 3.0);
        assert_eq!(keep_latest(bars, 10).len(), 5);
    }
}
