use crate::config::Settings;
use crate::domain::symbol::TickerSymbol;
use crate::ingest::provider::{keep_latest, MarketDataProvider};
use crate::ingest::types::{DailyBar, InfoFields};
use anyhow::{Context, Result};
use chrono::DateTime;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;

const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SUMMARY_BASE_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
const SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,assetProfile";
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Keyless Yahoo Finance provider.
///
/// Chart data is public. The quote-summary endpoint needs a session cookie and a crumb,
/// which are fetched on first use and reused for the rest of the process.
#[derive(Debug)]
pub struct YahooProvider {
    http: reqwest::Client,
    crumb_cache: tokio::sync::Mutex<Option<String>>,
}

impl YahooProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let http = reqwest::Client::builder()
            .timeout(settings.market_timeout())
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .context("failed to build Yahoo http client")?;

        Ok(Self {
            http,
            crumb_cache: tokio::sync::Mutex::new(None),
        })
    }

    async fn fetch_chart(&self, ticker: &TickerSymbol, range: &str) -> Result<ChartResult> {
        let url = format!("{CHART_BASE_URL}/{ticker}");
        let res = self
            .http
            .get(url)
            .query(&[("range", range), ("interval", "1d")])
            .send()
            .await
            .context("Yahoo chart request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Yahoo chart response")?;
        if !status.is_success() {
            anyhow::bail!("Yahoo chart HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<ChartResponse>(&text)
            .context("failed to parse Yahoo chart response")?;
        parsed.into_result()
    }

    async fn crumb(&self) -> Result<String> {
        let mut guard = self.crumb_cache.lock().await;
        if let Some(crumb) = guard.as_ref() {
            return Ok(crumb.clone());
        }

        // Only the Set-Cookie header matters; the status is usually 404.
        self.http
            .get(COOKIE_URL)
            .send()
            .await
            .context("Yahoo cookie request failed")?;

        let res = self
            .http
            .get(CRUMB_URL)
            .send()
            .await
            .context("Yahoo crumb request failed")?;
        let status = res.status();
        let crumb = res
            .text()
            .await
            .context("failed to read Yahoo crumb")?
            .trim()
            .to_string();
        anyhow::ensure!(
            status.is_success() && !crumb.is_empty(),
            "Yahoo crumb HTTP {status}"
        );

        *guard = Some(crumb.clone());
        Ok(crumb)
    }

    async fn fetch_summary_once(&self, ticker: &TickerSymbol) -> Result<(StatusCode, String)> {
        let crumb = self.crumb().await?;
        let url = format!("{SUMMARY_BASE_URL}/{ticker}");
        let res = self
            .http
            .get(url)
            .query(&[("modules", SUMMARY_MODULES), ("crumb", crumb.as_str())])
            .send()
            .await
            .context("Yahoo quote summary request failed")?;
        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Yahoo quote summary response")?;
        Ok((status, text))
    }

    async fn fetch_summary(&self, ticker: &TickerSymbol) -> Result<SummaryResult> {
        let (mut status, mut text) = self.fetch_summary_once(ticker).await?;

        // A stale crumb shows up as 401; refresh it once.
        if status == StatusCode::UNAUTHORIZED {
            tracing::debug!(%ticker, "Yahoo crumb rejected; refreshing");
            *self.crumb_cache.lock().await = None;
            (status, text) = self.fetch_summary_once(ticker).await?;
        }

        if !status.is_success() {
            anyhow::bail!("Yahoo quote summary HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<SummaryResponse>(&text)
            .context("failed to parse Yahoo quote summary response")?;
        parsed.into_result()
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooProvider {
    fn provider_name(&self) -> &'static str {
        "yahoo"
    }

    async fn fast_price(&self, ticker: &TickerSymbol) -> Result<Option<f64>> {
        let chart = self.fetch_chart(ticker, "1d").await?;
        Ok(chart.meta.regular_market_price)
    }

    async fn info(&self, ticker: &TickerSymbol) -> Result<InfoFields> {
        Ok(self.fetch_summary(ticker).await?.into_info())
    }

    async fn history(&self, ticker: &TickerSymbol, sessions: usize) -> Result<Vec<DailyBar>> {
        let chart = self.fetch_chart(ticker, chart_range(sessions)).await?;
        Ok(keep_latest(chart.into_bars(), sessions))
    }
}

/// Smallest chart range that covers `sessions` trading days.
fn chart_range(sessions: usize) -> &'static str {
    match sessions {
        0..=20 => "1mo",
        21..=62 => "3mo",
        63..=125 => "6mo",
        126..=250 => "1y",
        _ => "2y",
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<VendorError>,
}

#[derive(Debug, Deserialize)]
struct VendorError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

impl ChartResponse {
    fn into_result(self) -> Result<ChartResult> {
        if let Some(err) = self.chart.error {
            anyhow::bail!("Yahoo chart error {}: {}", err.code, err.description);
        }
        self.chart
            .result
            .and_then(|mut r| r.pop())
            .context("Yahoo chart returned no result")
    }
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl ChartResult {
    fn into_bars(self) -> Vec<DailyBar> {
        let Some(quote) = self.indicators.quote.into_iter().next() else {
            return Vec::new();
        };

        self.timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let close = quote.close.get(i).copied().flatten()?;
                let volume = quote.volume.get(i).copied().flatten().unwrap_or(0.0);
                let date = DateTime::from_timestamp(ts, 0)?.date_naive();
                Some(DailyBar {
                    date,
                    close,
                    volume,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<SummaryResult>>,
    error: Option<VendorError>,
}

impl SummaryResponse {
    fn into_result(self) -> Result<SummaryResult> {
        if let Some(err) = self.quote_summary.error {
            anyhow::bail!("Yahoo quote summary error {}: {}", err.code, err.description);
        }
        self.quote_summary
            .result
            .and_then(|mut r| r.pop())
            .context("Yahoo quote summary returned no result")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryResult {
    price: Option<PriceModule>,
    #[serde(rename = "summaryDetail")]
    summary_detail: Option<SummaryDetailModule>,
    #[serde(rename = "defaultKeyStatistics")]
    key_statistics: Option<KeyStatisticsModule>,
    #[serde(rename = "assetProfile")]
    asset_profile: Option<AssetProfileModule>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`, or `{}` when absent.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(v: &Option<RawValue>) -> Option<f64> {
    v.as_ref().and_then(|v| v.raw)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PriceModule {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<RawValue>,
    #[serde(rename = "regularMarketPreviousClose")]
    regular_market_previous_close: Option<RawValue>,
    #[serde(rename = "longName")]
    long_name: Option<String>,
    #[serde(rename = "shortName")]
    short_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryDetailModule {
    #[serde(rename = "previousClose")]
    previous_close: Option<RawValue>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(rename = "fiftyTwoWeekHigh")]
    fifty_two_week_high: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KeyStatisticsModule {
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AssetProfileModule {
    sector: Option<String>,
}

impl SummaryResult {
    fn into_info(self) -> InfoFields {
        let price = self.price.unwrap_or_default();
        let detail = self.summary_detail.unwrap_or_default();
        let stats = self.key_statistics.unwrap_or_default();

        InfoFields {
            current_price: raw(&price.regular_market_price),
            previous_close: raw(&price.regular_market_previous_close)
                .or_else(|| raw(&detail.previous_close)),
            forward_pe: raw(&detail.forward_pe).or_else(|| raw(&stats.forward_pe)),
            trailing_pe: raw(&detail.trailing_pe),
            sector: self.asset_profile.and_then(|p| p.sector),
            name: price.long_name.or(price.short_name),
            fifty_two_week_high: raw(&detail.fifty_two_week_high),
        }
    }
}
