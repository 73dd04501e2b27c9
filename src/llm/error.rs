use thiserror::Error;

use crate::core::errors::ApiError;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API key is not configured (set ANTHROPIC_API_KEY)")]
    MissingApiKey,
    #[error("{0}")]
    CreditExhausted(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("LLM API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("LLM transport error: {0}")]
    Transport(String),
    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Transport(err.to_string())
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::CreditExhausted(msg) => ApiError::PaymentRequired(format!(
                "AI service credit balance is too low: {}",
                msg
            )),
            LlmError::RateLimited(msg) => {
                ApiError::TooManyRequests(format!("AI service rate limit reached: {}", msg))
            }
            LlmError::InvalidRequest(msg) => {
                ApiError::BadRequest(format!("Invalid request to AI service: {}", msg))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn provider_failures_map_to_client_visible_statuses() {
        let cases = [
            (LlmError::CreditExhausted("low".into()), StatusCode::PAYMENT_REQUIRED),
            (LlmError::RateLimited("slow down".into()), StatusCode::TOO_MANY_REQUESTS),
            (LlmError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
            (LlmError::MissingApiKey, StatusCode::INTERNAL_SERVER_ERROR),
            (
                LlmError::Api { status: 529, message: "overloaded".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }
}
