use crate::ingest::types::QuoteSnapshot;
use serde::{Deserialize, Serialize};

pub const RSI_PERIOD: usize = 14;
pub const NEUTRAL_RSI: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// `(current - high) / high`; negative below the high.
    pub drawdown: f64,
    pub rsi: f64,
    /// Latest session volume over the window mean.
    pub volume_ratio: f64,
}

pub fn derive(snapshot: &QuoteSnapshot) -> DerivedMetrics {
    DerivedMetrics {
        drawdown: drawdown(snapshot.price, snapshot.reference_high),
        rsi: rsi(&snapshot.closes()),
        volume_ratio: volume_ratio(&snapshot.volumes()),
    }
}

/// A zero high is replaced by the current price, so the result is 0 rather than a division by zero.
pub fn drawdown(current: f64, high: f64) -> f64 {
    let high = if high == 0.0 { current } else { high };
    if high == 0.0 {
        return 0.0;
    }
    (current - high) / high
}

/// Wilder's 14-period RSI of the last close.
///
/// Average gain and loss are seeded with the first change and then smoothed with
/// `alpha = 1/14`. Neutral when the series is too short or has no movement at all.
pub fn rsi(closes: &[f64]) -> f64 {
    if closes.len() <= RSI_PERIOD {
        return NEUTRAL_RSI;
    }
    let period = RSI_PERIOD as f64;
    let mut changes = closes.windows(2).map(|w| w[1] - w[0]);
    let Some(first) = changes.next() else {
        return NEUTRAL_RSI;
    };

    let mut avg_gain = first.max(0.0);
    let mut avg_loss = (-first).max(0.0);
    for change in changes {
        avg_gain = avg_gain * (period - 1.0) / period + change.max(0.0) / period;
        avg_loss = avg_loss * (period - 1.0) / period + (-change).max(0.0) / period;
    }

    let total = avg_gain + avg_loss;
    if total == 0.0 || !total.is_finite() {
        return NEUTRAL_RSI;
    }
    100.0 * avg_gain / total
}

pub fn volume_ratio(volumes: &[f64]) -> f64 {
    let Some(&latest) = volumes.last() else {
        return 1.0;
    };
    let mean = volumes.iter().sum::<f64>() / volumes.len() as f64;
    if mean == 0.0 || !mean.is_finite() {
        return 1.0;
    }
    latest / mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::symbol::TickerSymbol;
    use crate::ingest::types::DailyBar;
    use chrono::NaiveDate;

    #[test]
    fn drawdown_below_high_is_negative() {
        assert!((drawdown(80.0, 100.0) - -0.2).abs() < 1e-12);
        assert_eq!(drawdown(100.0, 100.0), 0.0);
    }

    #[test]
    fn drawdown_zero_high_uses_current() {
        assert_eq!(drawdown(42.0, 0.0), 0.0);
        assert_eq!(drawdown(0.0, 0.0), 0.0);
    }

    #[test]
    fn rsi_is_neutral_for_short_series() {
        let closes: Vec<f64> = (0..RSI_PERIOD).map(|i| 100.0 - i as f64).collect();
        assert_eq!(rsi(&closes), NEUTRAL_RSI);
        assert_eq!(rsi(&[]), NEUTRAL_RSI);
    }

    #[test]
    fn rsi_tracks_direction() {
        let rising: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let falling: Vec<f64> = (0..40).map(|i| 100.0 - i as f64).collect();
        assert!(rsi(&rising) > 70.0);
        assert!(rsi(&falling) < 30.0);
        let r = rsi(&rising);
        assert!((0.0..=100.0).contains(&r));
    }

    #[test]
    fn rsi_uses_wilder_smoothing() {
        // Classic Wilder worksheet closes, smoothed from the first change.
        let closes = [
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64, 46.21, 46.25, 45.71, 46.45,
            45.78, 45.35, 44.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        assert!((rsi(&closes) - 33.7417).abs() < 1e-3, "got {}", rsi(&closes));
    }

    #[test]
    fn short_bounce_after_long_slide_stays_oversold() {
        let mut closes: Vec<f64> = (0..45).map(|i| 100.0 - 0.5 * i as f64).collect();
        for _ in 0..5 {
            let last = closes[closes.len() - 1];
            closes.push(last + 0.6);
        }
        let r = rsi(&closes);
        assert!((r - 34.9898).abs() < 1e-3, "got {r}");
        assert!(r < 40.0);
    }

    #[test]
    fn flat_series_is_neutral() {
        assert_eq!(rsi(&[25.0; 30]), NEUTRAL_RSI);
    }

    #[test]
    fn volume_ratio_against_window_mean() {
        assert_eq!(volume_ratio(&[100.0, 100.0, 400.0]), 2.0);
        assert_eq!(volume_ratio(&[0.0, 0.0]), 1.0);
        assert_eq!(volume_ratio(&[]), 1.0);
    }

    #[test]
    fn derive_uses_snapshot_fields() {
        let history: Vec<DailyBar> = (0..30)
            .map(|i| DailyBar {
                date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap() + chrono::Duration::days(i),
                close: 100.0 - i as f64,
                volume: if i == 29 { 3_000.0 } else { 1_000.0 },
            })
            .collect();
        let snapshot = QuoteSnapshot {
            ticker: TickerSymbol::parse("ttd").unwrap(),
            name: "The Trade Desk".into(),
            sector: "Technology".into(),
            price: 71.0,
            valuation_ratio: 22.0,
            reference_high: 100.0,
            history,
        };
        let m = derive(&snapshot);
        assert!((m.drawdown - -0.29).abs() < 1e-12);
        assert!(m.rsi < 30.0);
        assert!(m.volume_ratio > 2.5);
    }
}
