use crate::domain::symbol::TickerSymbol;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Trading sessions of daily history fetched per ticker (about three months).
pub const DEFAULT_LOOKBACK_SESSIONS: usize = 60;

pub const UNKNOWN_SECTOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
}

/// Descriptive fields from a provider's full info lookup. Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoFields {
    /// Live price.
    pub current_price: Option<f64>,
    /// Most recent close.
    pub previous_close: Option<f64>,
    pub forward_pe: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub sector: Option<String>,
    pub name: Option<String>,
    pub fifty_two_week_high: Option<f64>,
}

/// Resolved per-ticker facts. `price` is always positive and `history` non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub ticker: TickerSymbol,
    pub name: String,
    pub sector: String,
    pub price: f64,
    pub valuation_ratio: f64,
    pub reference_high: f64,
    /// Oldest first.
    pub history: Vec<DailyBar>,
}

impl QuoteSnapshot {
    pub fn closes(&self) -> Vec<f64> {
        self.history.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.history.iter().map(|b| b.volume).collect()
    }
}
