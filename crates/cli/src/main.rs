use clap::{Parser, ValueEnum};
use dipscan_core::analysis::scoring::ScoringRules;
use dipscan_core::config::Settings;
use dipscan_core::ingest::alpha_vantage::AlphaVantageProvider;
use dipscan_core::ingest::provider::MarketDataProvider;
use dipscan_core::ingest::yahoo::YahooProvider;
use dipscan_core::llm::anthropic::AnthropicClient;
use dipscan_core::llm::gemini::GeminiClient;
use dipscan_core::llm::LlmClient;
use dipscan_core::pipeline::{BatchOptions, SessionState};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod table;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LlmChoice {
    Anthropic,
    Gemini,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceChoice {
    Yahoo,
    AlphaVantage,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RulesChoice {
    Strict,
    Relaxed,
}

#[derive(Debug, Parser)]
#[command(name = "dipscan")]
struct Args {
    /// Analysis date anchor put into the prompt, as free text. Defaults to today's date.
    #[arg(long)]
    analysis_date: Option<String>,

    #[arg(long, value_enum, default_value_t = LlmChoice::Gemini)]
    llm: LlmChoice,

    #[arg(long, value_enum, default_value_t = SourceChoice::Yahoo)]
    source: SourceChoice,

    #[arg(long, value_enum, default_value_t = RulesChoice::Strict)]
    rules: RulesChoice,

    /// Comma-separated tickers to verify instead of asking the model.
    #[arg(long)]
    tickers: Option<String>,

    /// Stop after printing the model's picks.
    #[arg(long)]
    recommend_only: bool,

    /// Print the prompt before sending it.
    #[arg(long)]
    show_prompt: bool,

    /// Write the ranked table to this CSV file.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Pause between tickers, overriding MARKET_REQ_DELAY_MS.
    #[arg(long)]
    request_delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let today = chrono::Local::now().date_naive();
    let anchor =
        dipscan_core::time::anchor::resolve_analysis_anchor(args.analysis_date.as_deref(), today);
    let mut state = SessionState::new(anchor);

    match args.tickers.as_deref() {
        Some(list) => state.set_picks(dipscan_core::llm::parse::parse_tickers(list)),
        None => run_recommendation(&settings, &args, &mut state).await,
    }

    if args.recommend_only {
        return Ok(());
    }
    if state.picks.is_empty() {
        tracing::warn!(anchor = %state.anchor, "no tickers to verify");
        return Ok(());
    }

    run_verification(&settings, &args, &mut state).await;
    Ok(())
}

async fn run_recommendation(settings: &Settings, args: &Args, state: &mut SessionState) {
    let client = match build_llm(settings, args.llm) {
        Ok(client) => client,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "recommendation stage unavailable");
            eprintln!("Recommendation skipped: {err:#}");
            return;
        }
    };

    if args.show_prompt {
        println!("{}", dipscan_core::llm::prompt::strategy_prompt(&state.anchor));
    }

    let outcome = dipscan_core::llm::recommend::recommend_tickers(client.as_ref(), &state.anchor).await;
    if let Some(err) = &outcome.error {
        eprintln!("Recommendation failed: {err}");
        if let Some(raw) = &outcome.raw_response {
            eprintln!("Upstream response: {raw}");
        }
    } else {
        println!(
            "Picks for {} ({}): {}",
            outcome.anchor,
            outcome.tickers.len(),
            outcome.tickers.join(", ")
        );
    }
    state.apply_recommendation(outcome);
}

async fn run_verification(settings: &Settings, args: &Args, state: &mut SessionState) {
    let provider = match build_provider(settings, args.source) {
        Ok(provider) => provider,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "verification stage unavailable");
            eprintln!("Verification skipped: {err:#}");
            return;
        }
    };

    let rules = match args.rules {
        RulesChoice::Strict => ScoringRules::strict(),
        RulesChoice::Relaxed => ScoringRules::relaxed(),
    };
    let delay_ms = args
        .request_delay_ms
        .or(settings.market_req_delay_ms)
        .unwrap_or(match args.source {
            SourceChoice::Yahoo => 500,
            SourceChoice::AlphaVantage => 12_000,
        });
    let opts = BatchOptions {
        rules,
        request_delay: Duration::from_millis(delay_ms),
        ticker_timeout: settings.ticker_timeout(),
        ..BatchOptions::default()
    };

    tracing::info!(
        source = provider.provider_name(),
        tickers = state.picks.len(),
        delay_ms,
        "verifying picks"
    );
    let report = dipscan_core::pipeline::verify_batch(provider.as_ref(), &state.picks, &opts).await;

    if report.is_empty() {
        println!("No tickers passed verification.");
    } else {
        println!("{}", table::render_results(&report.results));
    }
    if let Some(summary) = table::skipped_summary(&report.skipped) {
        println!("{summary}");
    }

    if let Some(path) = &args.export {
        if let Err(err) = dipscan_core::export::export_csv(&report.results, path) {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "export failed");
            eprintln!("Export failed: {err:#}");
        } else {
            println!("Exported {} rows to {}", report.results.len(), path.display());
        }
    }

    state.report = Some(report);
}

fn build_llm(settings: &Settings, choice: LlmChoice) -> anyhow::Result<Box<dyn LlmClient>> {
    let client: Box<dyn LlmClient> = match choice {
        LlmChoice::Anthropic => Box::new(AnthropicClient::from_settings(settings)?),
        LlmChoice::Gemini => Box::new(GeminiClient::from_settings(settings)?),
    };
    Ok(client)
}

fn build_provider(
    settings: &Settings,
    choice: SourceChoice,
) -> anyhow::Result<Box<dyn MarketDataProvider>> {
    let provider: Box<dyn MarketDataProvider> = match choice {
        SourceChoice::Yahoo => Box::new(YahooProvider::from_settings(settings)?),
        SourceChoice::AlphaVantage => Box::new(AlphaVantageProvider::from_settings(settings)?),
    };
    Ok(provider)
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
