use serde::{Deserialize, Serialize};

/// One row of the ranked verification table.
///
/// Field names double as the CSV header on export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub price: f64,
    pub valuation_ratio: f64,
    /// Drawdown from the reference high, formatted like `-18.4%`.
    pub drawdown: String,
    pub rsi: f64,
    pub volume_ratio: f64,
    pub score: u8,
    pub tag: String,
}

/// Verdict derived from the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Watch,
    Caution,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Watch => "Worth watching",
            Verdict::Caution => "Use caution",
        }
    }
}

/// Individual triggers that can be appended to the verdict label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Oversold,
    Undervalued,
    VolumeSpike,
}

impl Signal {
    pub fn label(self) -> &'static str {
        match self {
            Signal::Oversold => "oversold",
            Signal::Undervalued => "undervalued",
            Signal::VolumeSpike => "volume spike",
        }
    }
}

/// Renders `Worth watching (oversold, undervalued)` style tags.
pub fn format_tag(verdict: Verdict, signals: &[Signal]) -> String {
    if signals.is_empty() {
        return verdict.label().to_string();
    }
    let labels: Vec<&str> = signals.iter().map(|s| s.label()).collect();
    format!("{} ({})", verdict.label(), labels.join(", "))
}

/// Formats a drawdown ratio as a one-decimal percentage string.
pub fn format_drawdown(ratio: f64) -> String {
    let pct = round_to(ratio * 100.0, 1);
    // Avoid printing "-0.0%".
    let pct = if pct == 0.0 { 0.0 } else { pct };
    format!("{pct:.1}%")
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_lists_signals_in_order() {
        assert_eq!(format_tag(Verdict::Caution, &[]), "Use caution");
        assert_eq!(
            format_tag(Verdict::Watch, &[Signal::Oversold, Signal::VolumeSpike]),
            "Worth watching (oversold, volume spike)"
        );
    }

    #[test]
    fn drawdown_is_formatted_as_percentage() {
        assert_eq!(format_drawdown(-0.18437), "-18.4%");
        assert_eq!(format_drawdown(0.0), "0.0%");
        assert_eq!(format_drawdown(-0.00001), "0.0%");
        assert_eq!(format_drawdown(0.05), "5.0%");
    }
}
