use crate::config::Settings;
use crate::domain::symbol::TickerSymbol;
use crate::ingest::provider::{keep_latest, MarketDataProvider};
use crate::ingest::types::{DailyBar, InfoFields};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

/// Alpha Vantage provider. Free keys are limited to a handful of calls per minute,
/// so callers should pair it with a long courtesy delay between tickers.
#[derive(Debug)]
pub struct AlphaVantageProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    /// Last GLOBAL_QUOTE, keyed by symbol, so `info` can reuse it without another call.
    last_quote: Mutex<Option<(String, GlobalQuote)>>,
}

impl AlphaVantageProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_alpha_vantage_api_key()?.to_string();
        let base_url = std::env::var("ALPHA_VANTAGE_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let http = reqwest::Client::builder()
            .timeout(settings.market_timeout())
            .build()
            .context("failed to build Alpha Vantage http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            last_quote: Mutex::new(None),
        })
    }

    async fn global_quote(&self, ticker: &TickerSymbol) -> Result<GlobalQuote> {
        let raw = self.query("GLOBAL_QUOTE", ticker).await?;
        let parsed = serde_json::from_value::<GlobalQuoteResponse>(raw)
            .context("failed to parse GLOBAL_QUOTE response")?;
        *self.last_quote.lock().await = Some((ticker.to_string(), parsed.quote.clone()));
        Ok(parsed.quote)
    }

    async fn cached_or_fresh_quote(&self, ticker: &TickerSymbol) -> Option<GlobalQuote> {
        let cached = self
            .last_quote
            .lock()
            .await
            .as_ref()
            .filter(|(symbol, _)| symbol == ticker.as_str())
            .map(|(_, quote)| quote.clone());
        if cached.is_some() {
            return cached;
        }
        match self.global_quote(ticker).await {
            Ok(quote) => Some(quote),
            Err(err) => {
                tracing::debug!(%ticker, error = %err, "quote unavailable for info fields");
                None
            }
        }
    }

    async fn query(&self, function: &str, ticker: &TickerSymbol) -> Result<Value> {
        let url = format!("{}/query", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .get(url)
            .query(&[
                ("function", function),
                ("symbol", ticker.as_str()),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("Alpha Vantage {function} request failed"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Alpha Vantage response")?;
        if !status.is_success() {
            anyhow::bail!("Alpha Vantage {function} HTTP {status}: {text}");
        }

        let raw_json = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("Alpha Vantage response is not valid JSON: {text}"))?;
        check_vendor_notice(&raw_json)?;
        Ok(raw_json)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn provider_name(&self) -> &'static str {
        "alpha_vantage"
    }

    async fn fast_price(&self, ticker: &TickerSymbol) -> Result<Option<f64>> {
        Ok(self.global_quote(ticker).await?.price())
    }

    async fn info(&self, ticker: &TickerSymbol) -> Result<InfoFields> {
        let raw = self.query("OVERVIEW", ticker).await?;
        let parsed = serde_json::from_value::<OverviewResponse>(raw)
            .context("failed to parse OVERVIEW response")?;
        let quote = self.cached_or_fresh_quote(ticker).await;
        Ok(parsed.into_info(quote.as_ref()))
    }

    async fn history(&self, ticker: &TickerSymbol, sessions: usize) -> Result<Vec<DailyBar>> {
        let raw = self.query("TIME_SERIES_DAILY", ticker).await?;
        let parsed = serde_json::from_value::<DailySeriesResponse>(raw)
            .context("failed to parse TIME_SERIES_DAILY response")?;
        Ok(keep_latest(parsed.into_bars()?, sessions))
    }
}

/// Rate-limit and error notices arrive with HTTP 200 under one of these keys.
fn check_vendor_notice(raw: &Value) -> Result<()> {
    for key in ["Error Message", "Note", "Information"] {
        if let Some(msg) = raw.get(key).and_then(Value::as_str) {
            anyhow::bail!("Alpha Vantage {key}: {msg}");
        }
    }
    Ok(())
}

/// Alpha Vantage encodes numbers as strings and absent values as "None" or "-".
fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == "None" || s == "-" {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_text(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "None" && s != "-")
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote", default)]
    quote: GlobalQuote,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
}

impl GlobalQuote {
    fn price(&self) -> Option<f64> {
        self.price.as_deref().and_then(parse_number)
    }

    fn previous_close(&self) -> Option<f64> {
        self.previous_close.as_deref().and_then(parse_number)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OverviewResponse {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Sector")]
    sector: Option<String>,
    #[serde(rename = "ForwardPE")]
    forward_pe: Option<String>,
    #[serde(rename = "TrailingPE")]
    trailing_pe: Option<String>,
    #[serde(rename = "52WeekHigh")]
    fifty_two_week_high: Option<String>,
}

impl OverviewResponse {
    fn into_info(self, quote: Option<&GlobalQuote>) -> InfoFields {
        let num = |v: Option<String>| v.as_deref().and_then(parse_number);
        InfoFields {
            current_price: quote.and_then(GlobalQuote::price),
            previous_close: quote.and_then(GlobalQuote::previous_close),
            forward_pe: num(self.forward_pe),
            trailing_pe: num(self.trailing_pe),
            sector: parse_text(self.sector).map(|s| title_case(&s)),
            name: parse_text(self.name),
            fifty_two_week_high: num(self.fifty_two_week_high),
        }
    }
}

/// OVERVIEW reports sectors in upper case ("TECHNOLOGY").
fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let lower = w.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Deserialize)]
struct DailySeriesResponse {
    #[serde(rename = "Time Series (Daily)", default)]
    series: BTreeMap<String, DailySeriesBar>,
}

#[derive(Debug, Deserialize)]
struct DailySeriesBar {
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume", default)]
    volume: Option<String>,
}

impl DailySeriesResponse {
    fn into_bars(self) -> Result<Vec<DailyBar>> {
        let mut bars = Vec::with_capacity(self.series.len());
        // BTreeMap iterates ISO dates oldest first.
        for (date, bar) in self.series {
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .with_context(|| format!("invalid series date {date}"))?;
            let Some(close) = parse_number(&bar.close) else {
                continue;
            };
            let volume = bar.volume.as_deref().and_then(parse_number).unwrap_or(0.0);
            bars.push(DailyBar {
                date,
                close,
                volume,
            });
        }
        Ok(bars)
    }
}
