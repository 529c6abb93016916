use crate::analysis::metrics::{derive, DerivedMetrics};
use crate::analysis::scoring::{score, ScoreCard, ScoringRules};
use crate::domain::result::{format_drawdown, round_to, ScoredResult};
use crate::domain::symbol::TickerSymbol;
use crate::ingest::provider::MarketDataProvider;
use crate::ingest::retriever::{retrieve, Retrieval};
use crate::ingest::types::{QuoteSnapshot, DEFAULT_LOOKBACK_SESSIONS};
use crate::llm::recommend::RecommendationOutcome;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub rules: ScoringRules,
    pub lookback_sessions: usize,
    /// Courtesy pause between consecutive tickers that hit the provider.
    pub request_delay: Duration,
    /// Upper bound on all provider calls for a single ticker.
    pub ticker_timeout: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            rules: ScoringRules::default(),
            lookback_sessions: DEFAULT_LOOKBACK_SESSIONS,
            request_delay: Duration::from_millis(500),
            ticker_timeout: Duration::from_secs(45),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptySymbol,
    NoPrice,
    NoHistory,
    Timeout,
    /// Near the high and not oversold.
    Suppressed,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::EmptySymbol => "empty symbol",
            SkipReason::NoPrice => "price unavailable",
            SkipReason::NoHistory => "no price history",
            SkipReason::Timeout => "timed out",
            SkipReason::Suppressed => "no signal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTicker {
    pub raw: String,
    pub reason: SkipReason,
}

/// Stage 2 output: the ranked table plus what was dropped along the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Sorted by score, highest first; ties keep input order.
    pub results: Vec<ScoredResult>,
    pub skipped: Vec<SkippedTicker>,
}

impl VerificationReport {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Everything one session has produced so far. Each stage replaces its part wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub anchor: String,
    pub picks: Vec<String>,
    pub report: Option<VerificationReport>,
}

impl SessionState {
    pub fn new(anchor: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
            ..Default::default()
        }
    }

    /// Takes new picks and discards any report built from the previous ones.
    pub fn set_picks(&mut self, picks: Vec<String>) {
        self.picks = picks;
        self.report = None;
    }

    pub fn apply_recommendation(&mut self, outcome: RecommendationOutcome) {
        self.anchor = outcome.anchor;
        self.set_picks(outcome.tickers);
    }
}

/// Builds one output row from a snapshot and its scoring.
pub fn build_result(snapshot: &QuoteSnapshot, metrics: &DerivedMetrics, card: &ScoreCard) -> ScoredResult {
    ScoredResult {
        ticker: snapshot.ticker.to_string(),
        name: snapshot.name.clone(),
        sector: snapshot.sector.clone(),
        price: round_to(snapshot.price, 2),
        valuation_ratio: round_to(snapshot.valuation_ratio, 2),
        drawdown: format_drawdown(metrics.drawdown),
        rsi: round_to(metrics.rsi, 1),
        volume_ratio: round_to(metrics.volume_ratio, 2),
        score: card.score,
        tag: card.tag(),
    }
}

/// Normalizes, retrieves, derives and scores every ticker, in order.
///
/// Individual tickers can fail or be suppressed without affecting the rest; an empty or
/// entirely failed batch yields an empty table.
pub async fn verify_batch(
    provider: &dyn MarketDataProvider,
    raw_tickers: &[String],
    opts: &BatchOptions,
) -> VerificationReport {
    let total = raw_tickers.len();
    let source = provider.provider_name();
    let mut report = VerificationReport::default();
    let mut called_provider = false;

    for (idx, raw) in raw_tickers.iter().enumerate() {
        let outcome = verify_one(provider, raw, opts, &mut called_provider).await;
        match outcome {
            Ok(row) => report.results.push(row),
            Err(reason) => {
                tracing::warn!(idx, raw = %raw, source, reason = reason.as_str(), "skipping ticker");
                report.skipped.push(SkippedTicker {
                    raw: raw.clone(),
                    reason,
                });
            }
        }

        tracing::info!(
            processed = idx + 1,
            total,
            results = report.results.len(),
            skipped = report.skipped.len(),
            "verification progress"
        );
    }

    // Stable: equal scores keep processing order.
    report.results.sort_by(|a, b| b.score.cmp(&a.score));

    if report.results.is_empty() {
        tracing::warn!(total, source, "verification produced no results");
    }
    report
}

async fn verify_one(
    provider: &dyn MarketDataProvider,
    raw: &str,
    opts: &BatchOptions,
    called_provider: &mut bool,
) -> Result<ScoredResult, SkipReason> {
    let ticker = TickerSymbol::parse(raw).ok_or(SkipReason::EmptySymbol)?;

    if *called_provider && !opts.request_delay.is_zero() {
        tokio::time::sleep(opts.request_delay).await;
    }
    *called_provider = true;

    let retrieval = tokio::time::timeout(
        opts.ticker_timeout,
        retrieve(provider, &ticker, opts.lookback_sessions),
    )
    .await
    .map_err(|_| SkipReason::Timeout)?;

    let snapshot = match retrieval {
        Retrieval::Found(snapshot) => snapshot,
        Retrieval::NoPrice => return Err(SkipReason::NoPrice),
        Retrieval::NoHistory => return Err(SkipReason::NoHistory),
    };

    let metrics = derive(&snapshot);
    let card = score(&metrics, snapshot.valuation_ratio, &opts.rules).ok_or(SkipReason::Suppressed)?;

    tracing::debug!(
        %ticker,
        score = card.score,
        drawdown = metrics.drawdown,
        rsi = metrics.rsi,
        volume_ratio = metrics.volume_ratio,
        "scored ticker"
    );
    Ok(build_result(&snapshot, &metrics, &card))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{DailyBar, InfoFields};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory provider keyed by normalized ticker.
    #[derive(Default)]
    struct FakeProvider {
        quotes: HashMap<String, (f64, InfoFields, Vec<DailyBar>)>,
        failing: Vec<String>,
        slow: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn with_quote(mut self, ticker: &str, price: f64, info: InfoFields, closes: &[f64]) -> Self {
            let history = closes
                .iter()
                .enumerate()
                .map(|(i, c)| DailyBar {
                    date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
                        + chrono::Duration::days(i as i64),
                    close: *c,
                    volume: 1_000.0,
                })
                .collect();
            self.quotes.insert(ticker.to_string(), (price, info, history));
            self
        }

        fn check(&self, ticker: &TickerSymbol) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(ticker.to_string());
            if self.failing.iter().any(|t| t == ticker.as_str()) {
                anyhow::bail!("connection reset for {ticker}");
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for FakeProvider {
        fn provider_name(&self) -> &'static str {
            "fake"
        }

        async fn fast_price(&self, ticker: &TickerSymbol) -> anyhow::Result<Option<f64>> {
            if self.slow.iter().any(|t| t == ticker.as_str()) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.check(ticker)?;
            Ok(self.quotes.get(ticker.as_str()).map(|q| q.0))
        }

        async fn info(&self, ticker: &TickerSymbol) -> anyhow::Result<InfoFields> {
            self.check(ticker)?;
            Ok(self
                .quotes
                .get(ticker.as_str())
                .map(|q| q.1.clone())
                .unwrap_or_default())
        }

        async fn history(&self, ticker: &TickerSymbol, _sessions: usize) -> anyhow::Result<Vec<DailyBar>> {
            self.check(ticker)?;
            Ok(self
                .quotes
                .get(ticker.as_str())
                .map(|q| q.2.clone())
                .unwrap_or_default())
        }
    }

    fn opts() -> BatchOptions {
        BatchOptions {
            request_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn info(pe: f64, high: f64) -> InfoFields {
        InfoFields {
            forward_pe: Some(pe),
            fifty_two_week_high: Some(high),
            sector: Some("Technology".into()),
            ..Default::default()
        }
    }

    fn falling() -> Vec<f64> {
        (0..40).map(|i| 100.0 - i as f64).collect()
    }

    fn tickers(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn partial_failures_do_not_abort_batch() {
        let mut provider = FakeProvider::default()
            .with_quote("AAA", 61.0, info(20.0, 100.0), &falling())
            .with_quote("BBB", 61.0, info(20.0, 100.0), &falling())
            .with_quote("CCC", 61.0, info(20.0, 100.0), &falling())
            .with_quote("DDD", 61.0, info(20.0, 100.0), &falling())
            .with_quote("EEE", 61.0, info(20.0, 100.0), &falling());
        provider.failing = vec!["BBB".into(), "DDD".into()];

        let report = verify_batch(&provider, &tickers(&["AAA", "BBB", "CCC", "DDD", "EEE"]), &opts()).await;
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped.iter().all(|s| s.reason == SkipReason::NoPrice));
    }

    #[tokio::test]
    async fn sorts_by_score_and_keeps_ties_in_input_order() {
        let provider = FakeProvider::default()
            // Near the high, cheap: 30 points under relaxed rules.
            .with_quote("LOW1", 99.0, info(20.0, 100.0), &[100.0; 20])
            // Deep drawdown, oversold, cheap: 100.
            .with_quote("TOP", 61.0, info(20.0, 100.0), &falling())
            .with_quote("LOW2", 99.0, info(20.0, 100.0), &[100.0; 20]);
        let opts = BatchOptions {
            rules: ScoringRules::relaxed(),
            ..opts()
        };

        let report = verify_batch(&provider, &tickers(&["low1", "top", "low2"]), &opts).await;
        let order: Vec<&str> = report.results.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(order, vec!["TOP", "LOW1", "LOW2"]);
        assert_eq!(report.results[0].score, 100);
        assert_eq!(report.results[1].score, report.results[2].score);
    }

    #[tokio::test]
    async fn builds_formatted_rows() {
        let provider = FakeProvider::default().with_quote("BRK-B", 61.237, info(20.0, 100.0), &falling());
        let report = verify_batch(&provider, &tickers(&["nasdaq:brk.b"]), &opts()).await;
        let row = &report.results[0];
        assert_eq!(row.ticker, "BRK-B");
        assert_eq!(row.price, 61.24);
        assert_eq!(row.drawdown, "-38.8%");
        assert_eq!(row.sector, "Technology");
        assert_eq!(row.score, 100);
        assert!(row.tag.starts_with("Worth watching"));
    }

    #[tokio::test]
    async fn calm_and_blank_tickers_are_skipped() {
        let provider = FakeProvider::default()
            .with_quote("CALM", 99.0, info(20.0, 100.0), &(0..40).map(|i| 60.0 + i as f64).collect::<Vec<_>>());
        let report = verify_batch(&provider, &tickers(&["  ", "CALM"]), &opts()).await;
        assert!(report.is_empty());
        assert_eq!(
            report.skipped.iter().map(|s| s.reason).collect::<Vec<_>>(),
            vec![SkipReason::EmptySymbol, SkipReason::Suppressed]
        );
        // Blank input never reaches the provider.
        assert_eq!(provider.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unknown_ticker_and_empty_batch_yield_empty_table() {
        let provider = FakeProvider::default();
        let report = verify_batch(&provider, &tickers(&["ZZZZ"]), &opts()).await;
        assert!(report.is_empty());
        assert_eq!(report.skipped[0].reason, SkipReason::NoPrice);

        let report = verify_batch(&provider, &[], &opts()).await;
        assert!(report.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_ticker_times_out() {
        let mut provider = FakeProvider::default()
            .with_quote("SLOW", 61.0, info(20.0, 100.0), &falling())
            .with_quote("FAST", 61.0, info(20.0, 100.0), &falling());
        provider.slow = vec!["SLOW".into()];
        let opts = BatchOptions {
            ticker_timeout: Duration::from_secs(5),
            ..opts()
        };

        let report = verify_batch(&provider, &tickers(&["SLOW", "FAST"]), &opts).await;
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].ticker, "FAST");
        assert_eq!(report.skipped[0].reason, SkipReason::Timeout);
    }

    #[test]
    fn new_picks_discard_old_report() {
        let mut state = SessionState::new("2026-03-14");
        state.report = Some(VerificationReport::default());
        state.apply_recommendation(RecommendationOutcome {
            anchor: "2026-03-15".into(),
            tickers: vec!["AAPL".into()],
            ..Default::default()
        });
        assert_eq!(state.anchor, "2026-03-15");
        assert_eq!(state.picks, vec!["AAPL"]);
        assert!(state.report.is_none());
    }
}
