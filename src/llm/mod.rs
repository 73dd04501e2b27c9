pub mod anthropic;
pub mod error;
pub mod generator;
pub mod provider;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use error::LlmError;
pub use generator::{AiGenerator, GeneratedAnswer};
pub use provider::{LlmProvider, UnconfiguredProvider};
pub use types::{
    ContentBlock, Message, MessageRequest, MessageResponse, Role, StopReason, ToolChoice,
    ToolDefinition, Usage,
};
