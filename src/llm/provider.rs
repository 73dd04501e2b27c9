use async_trait::async_trait;

use super::error::LlmError;
use super::types::{MessageRequest, MessageResponse};

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "anthropic")
    fn name(&self) -> &str;

    /// single Messages API call (non-streaming)
    async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse, LlmError>;
}

/// Stands in when no API key is configured so the server can still start
/// and serve course listings; every generation attempt fails.
pub struct UnconfiguredProvider;

#[async_trait]
impl LlmProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn create_message(&self, _request: &MessageRequest) -> Result<MessageResponse, LlmError> {
        Err(LlmError::MissingApiKey)
    }
}
