use crate::llm::parse::parse_tickers;
use crate::llm::prompt::strategy_prompt;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::LlmClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stage 1 output. `error` carries a reportable, non-fatal failure; `tickers` is then empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationOutcome {
    pub anchor: String,
    pub tickers: Vec<String>,
    pub error: Option<String>,
    /// Upstream body behind `error`, when the client kept one.
    pub raw_response: Option<Value>,
}

impl RecommendationOutcome {
    fn failed(anchor: &str, error: String) -> Self {
        Self {
            anchor: anchor.to_string(),
            tickers: Vec::new(),
            error: Some(error),
            raw_response: None,
        }
    }
}

/// Raw upstream payload carried by an inference error, as JSON when it parses.
pub fn raw_response_of(err: &anyhow::Error) -> Option<Value> {
    let diag = err.downcast_ref::<LlmDiagnosticsError>()?;
    if let Some(json) = &diag.raw_response_json {
        return Some(json.clone());
    }
    let raw = diag.raw_output.as_deref()?;
    Some(serde_json::json!({ "raw_text": raw }))
}

/// Asks the model for picks anchored at `anchor` and parses the reply.
/// Never fails: upstream errors and empty replies become an empty list plus `error`.
pub async fn recommend_tickers(client: &dyn LlmClient, anchor: &str) -> RecommendationOutcome {
    let provider = client.provider().as_str();
    let prompt = strategy_prompt(anchor);

    let text = match client.complete(&prompt).await {
        Ok(text) => text,
        Err(err) => {
            let raw_response = raw_response_of(&err);
            tracing::warn!(
                provider,
                %anchor,
                error = %err,
                raw_response = ?raw_response,
                "recommendation call failed"
            );
            return RecommendationOutcome {
                raw_response,
                ..RecommendationOutcome::failed(anchor, format!("{err:#}"))
            };
        }
    };

    let tickers = parse_tickers(&text);
    if tickers.is_empty() {
        tracing::warn!(provider, %anchor, raw = %text, "model reply contained no tickers");
        return RecommendationOutcome::failed(anchor, "model returned no tickers".to_string());
    }

    tracing::info!(provider, %anchor, count = tickers.len(), "received recommendations");
    RecommendationOutcome {
        anchor: anchor.to_string(),
        tickers,
        error: None,
        raw_response: None,
    }
}
