use crate::domain::symbol::TickerSymbol;
use crate::ingest::provider::MarketDataProvider;
use crate::ingest::types::{DailyBar, InfoFields, QuoteSnapshot, UNKNOWN_SECTOR};

/// Everything fetched for one ticker, before any fallback is applied.
#[derive(Debug, Clone, Default)]
pub struct FieldSources {
    pub fast_price: Option<f64>,
    pub info: InfoFields,
    pub history: Vec<DailyBar>,
}

pub type Accessor = fn(&FieldSources) -> Option<f64>;

/// Ordered candidates for the current price. First positive value wins.
pub const PRICE_CHAIN: &[(&str, Accessor)] = &[
    ("fast_price", fast_price),
    ("info.current_price", info_current_price),
    ("info.previous_close", info_previous_close),
];

/// Ordered candidates for the valuation ratio. First non-zero value wins; otherwise 0.
pub const VALUATION_CHAIN: &[(&str, Accessor)] = &[
    ("info.forward_pe", info_forward_pe),
    ("info.trailing_pe", info_trailing_pe),
];

/// Ordered candidates for the reference high. First positive value wins; otherwise the price.
pub const HIGH_CHAIN: &[(&str, Accessor)] = &[
    ("info.fifty_two_week_high", info_fifty_two_week_high),
    ("history.max_close", history_max_close),
];

fn fast_price(s: &FieldSources) -> Option<f64> {
    s.fast_price
}

fn info_current_price(s: &FieldSources) -> Option<f64> {
    s.info.current_price
}

fn info_previous_close(s: &FieldSources) -> Option<f64> {
    s.info.previous_close
}

fn info_forward_pe(s: &FieldSources) -> Option<f64> {
    s.info.forward_pe
}

fn info_trailing_pe(s: &FieldSources) -> Option<f64> {
    s.info.trailing_pe
}

fn info_fifty_two_week_high(s: &FieldSources) -> Option<f64> {
    s.info.fifty_two_week_high
}

fn history_max_close(s: &FieldSources) -> Option<f64> {
    s.history
        .iter()
        .map(|b| b.close)
        .filter(|c| c.is_finite())
        .reduce(f64::max)
}

/// Walks `chain` in order and returns the first value accepted by `usable`,
/// together with the label of the accessor that produced it.
pub fn first_usable(
    chain: &[(&'static str, Accessor)],
    sources: &FieldSources,
    usable: impl Fn(f64) -> bool,
) -> Option<(&'static str, f64)> {
    chain.iter().find_map(|(label, accessor)| {
        accessor(sources)
            .filter(|v| v.is_finite() && usable(*v))
            .map(|v| (*label, v))
    })
}

/// Outcome of a retrieval. The two misses are not errors; the caller skips the ticker.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Found(QuoteSnapshot),
    NoPrice,
    NoHistory,
}

/// Applies the fallback chains and defaults to already-fetched sources.
pub fn resolve_snapshot(ticker: &TickerSymbol, sources: FieldSources) -> Retrieval {
    let Some((price_source, price)) = first_usable(PRICE_CHAIN, &sources, |v| v > 0.0) else {
        return Retrieval::NoPrice;
    };
    if sources.history.is_empty() {
        return Retrieval::NoHistory;
    }

    let valuation_ratio = first_usable(VALUATION_CHAIN, &sources, |v| v != 0.0)
        .map(|(_, v)| v)
        .unwrap_or(0.0);
    let reference_high = first_usable(HIGH_CHAIN, &sources, |v| v > 0.0)
        .map(|(_, v)| v)
        .unwrap_or(price);

    tracing::debug!(%ticker, price_source, price, valuation_ratio, reference_high, "resolved quote");

    let FieldSources { info, history, .. } = sources;
    let sector = info
        .sector
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_SECTOR.to_string());
    let name = info
        .name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| ticker.to_string());

    Retrieval::Found(QuoteSnapshot {
        ticker: ticker.clone(),
        name,
        sector,
        price,
        valuation_ratio,
        reference_high,
        history,
    })
}

/// Fetches every field for `ticker`, degrading each failed call to a missing value.
pub async fn retrieve(
    provider: &dyn MarketDataProvider,
    ticker: &TickerSymbol,
    lookback_sessions: usize,
) -> Retrieval {
    let source = provider.provider_name();

    let fast_price = match provider.fast_price(ticker).await {
        Ok(v) => v,
        Err(err) => {
            tracing::debug!(%ticker, source, error = %err, "fast price lookup failed; falling back");
            None
        }
    };

    let info = match provider.info(ticker).await {
        Ok(info) => info,
        Err(err) => {
            tracing::warn!(%ticker, source, error = %err, "info lookup failed; using defaults");
            InfoFields::default()
        }
    };

    let history = match provider.history(ticker, lookback_sessions).await {
        Ok(bars) => bars,
        Err(err) => {
            tracing::warn!(%ticker, source, error = %err, "history lookup failed");
            Vec::new()
        }
    };

    resolve_snapshot(
        ticker,
        FieldSources {
            fast_price,
            info,
            history,
        },
    )
}
