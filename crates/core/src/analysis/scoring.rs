use crate::analysis::metrics::DerivedMetrics;
use crate::domain::result::{format_tag, Signal, Verdict};
use serde::{Deserialize, Serialize};

pub const MAX_SCORE: u8 = 100;

/// Suppresses names that are close to their high and not oversold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalmFilter {
    pub drawdown_above: f64,
    pub rsi_above: f64,
}

/// Threshold table for the score. Points are awarded independently and the sum is capped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringRules {
    pub drawdown_below: f64,
    pub drawdown_points: u8,
    pub rsi_below: f64,
    pub rsi_points: u8,
    /// Bonus applies when `0 < ratio < valuation_below`.
    pub valuation_below: f64,
    pub valuation_points: u8,
    pub volume_ratio_above: Option<f64>,
    pub volume_points: u8,
    pub calm_filter: Option<CalmFilter>,
    /// Scores at or above this are tagged as worth watching.
    pub watch_cutoff: u8,
}

impl ScoringRules {
    /// Latest rule set: tighter RSI and valuation bands, volume bonus, calm filter.
    pub fn strict() -> Self {
        Self {
            drawdown_below: -0.15,
            drawdown_points: 40,
            rsi_below: 40.0,
            rsi_points: 30,
            valuation_below: 25.0,
            valuation_points: 30,
            volume_ratio_above: Some(1.5),
            volume_points: 10,
            calm_filter: Some(CalmFilter {
                drawdown_above: -0.05,
                rsi_above: 50.0,
            }),
            watch_cutoff: 70,
        }
    }

    /// Earlier rule set: looser bands, no volume bonus, nothing suppressed.
    pub fn relaxed() -> Self {
        Self {
            rsi_below: 45.0,
            valuation_below: 35.0,
            volume_ratio_above: None,
            calm_filter: None,
            ..Self::strict()
        }
    }
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self::strict()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub score: u8,
    pub verdict: Verdict,
    pub signals: Vec<Signal>,
}

impl ScoreCard {
    pub fn tag(&self) -> String {
        format_tag(self.verdict, &self.signals)
    }
}

/// Scores one ticker. `None` means the calm filter suppressed it.
///
/// Pure and total: NaN inputs fail every comparison and earn no points.
pub fn score(metrics: &DerivedMetrics, valuation_ratio: f64, rules: &ScoringRules) -> Option<ScoreCard> {
    if let Some(calm) = rules.calm_filter {
        if metrics.drawdown > calm.drawdown_above && metrics.rsi > calm.rsi_above {
            return None;
        }
    }

    let mut total: u32 = 0;
    let mut signals = Vec::new();

    if metrics.drawdown < rules.drawdown_below {
        total += u32::from(rules.drawdown_points);
    }
    if metrics.rsi < rules.rsi_below {
        total += u32::from(rules.rsi_points);
        signals.push(Signal::Oversold);
    }
    // Loss-making names report a zero or negative ratio and never get the valuation bonus.
    if valuation_ratio > 0.0 && valuation_ratio < rules.valuation_below {
        total += u32::from(rules.valuation_points);
        signals.push(Signal::Undervalued);
    }
    if let Some(threshold) = rules.volume_ratio_above {
        if metrics.volume_ratio > threshold {
            total += u32::from(rules.volume_points);
            signals.push(Signal::VolumeSpike);
        }
    }

    let score = total.min(u32::from(MAX_SCORE)) as u8;
    let verdict = if score >= rules.watch_cutoff {
        Verdict::Watch
    } else {
        Verdict::Caution
    };

    Some(ScoreCard {
        score,
        verdict,
        signals,
    })
}
