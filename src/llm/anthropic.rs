use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::error::LlmError;
use super::provider::LlmProvider;
use super::types::{MessageRequest, MessageResponse};
use crate::core::config::settings::LlmSettings;

const API_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(LlmError::MissingApiKey)?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);

        let res = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let err = classify_error(status, &text);
            tracing::warn!("Anthropic request failed ({}): {}", status, err);
            return Err(err);
        }

        res.json::<MessageResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

/// Maps an error response onto the failure classes clients distinguish.
pub fn classify_error(status: StatusCode, body: &str) -> LlmError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error_type = parsed
        .as_ref()
        .and_then(|v| v["error"]["type"].as_str())
        .unwrap_or_default()
        .to_string();
    let message = parsed
        .as_ref()
        .and_then(|v| v["error"]["message"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());

    if status == StatusCode::PAYMENT_REQUIRED
        || message.to_lowercase().contains("credit balance is too low")
    {
        return LlmError::CreditExhausted(message);
    }
    if status == StatusCode::TOO_MANY_REQUESTS || error_type == "rate_limit_error" {
        return LlmError::RateLimited(message);
    }
    if status == StatusCode::BAD_REQUEST || error_type == "invalid_request_error" {
        return LlmError::InvalidRequest(message);
    }

    LlmError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_body(kind: &str, message: &str) -> String {
        serde_json::json!({
            "type": "error",
            "error": {"type": kind, "message": message}
        })
        .to_string()
    }

    #[test]
    fn credit_message_wins_over_invalid_request() {
        let body = error_body(
            "invalid_request_error",
            "Your credit balance is too low to access the Anthropic API.",
        );
        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, &body),
            LlmError::CreditExhausted(_)
        ));
    }

    #[test]
    fn classifies_rate_limit_and_invalid_request() {
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, &error_body("rate_limit_error", "slow")),
            LlmError::RateLimited(_)
        ));
        match classify_error(
            StatusCode::BAD_REQUEST,
            &error_body("invalid_request_error", "max_tokens: too large"),
        ) {
            LlmError::InvalidRequest(msg) => assert_eq!(msg, "max_tokens: too large"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn other_statuses_keep_raw_body() {
        match classify_error(StatusCode::BAD_GATEWAY, "upstream down") {
            LlmError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let settings = LlmSettings {
            api_key: Some("   ".to_string()),
            ..LlmSettings::default()
        };
        assert!(matches!(
            AnthropicProvider::new(&settings),
            Err(LlmError::MissingApiKey)
        ));
    }

    #[tokio::test]
    #[ignore]
    async fn live_anthropic_round_trip() {
        use crate::llm::types::Message;

        let settings = LlmSettings {
            api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            ..LlmSettings::default()
        };
        let provider = AnthropicProvider::new(&settings).unwrap();
        let request = MessageRequest {
            model: settings.model.clone(),
            max_tokens: 20,
            temperature: 0.0,
            system: None,
            messages: vec![Message::user_text("Say hello")],
            tools: Vec::new(),
            tool_choice: None,
        };
        let response = provider.create_message(&request).await.unwrap();
        println!("Anthropic response: {}", response.text());
    }
}
