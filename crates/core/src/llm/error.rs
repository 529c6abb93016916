use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    /// Builds an `http` stage error from a non-success response body.
    pub fn http(provider: Provider, status: reqwest::StatusCode, body: String) -> Self {
        let raw_response_json = serde_json::from_str::<Value>(&body).ok();
        Self {
            provider,
            stage: "http",
            detail: format!("status={status}"),
            raw_output: Some(body),
            raw_response_json,
        }
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={}, stage={}): {}",
            self.provider.as_str(),
            self.stage,
            self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_keeps_body_and_json() {
        let err = LlmDiagnosticsError::http(
            Provider::Gemini,
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"quota"}}"#.to_string(),
        );
        assert_eq!(err.stage, "http");
        assert!(err.raw_response_json.is_some());
        assert!(err.to_string().contains("provider=gemini"));
        assert!(err.to_string().contains("429"));
    }
}
