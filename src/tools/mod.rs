//! Tools the model may call during generation.
//!
//! - `CourseSearchTool`: semantic search over course content
//! - `CourseOutlineTool`: course link + full lesson list
//! - `ToolManager`: name-keyed registry used by the generator

mod course_outline;
mod course_search;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::errors::ApiError;
use crate::llm::ToolDefinition;
use crate::rag::Source;

pub use course_outline::CourseOutlineTool;
pub use course_search::CourseSearchTool;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool definition must have a non-empty name")]
    MissingName,
    #[error("tool '{0}' is already registered")]
    Duplicate(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Store(#[from] ApiError),
}

/// Text handed back to the model plus the citations it produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub sources: Vec<Source>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError>;
}

#[derive(Default)]
pub struct ToolManager {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.definition().name.trim().to_string();
        if name.is_empty() {
            return Err(ToolError::MissingName);
        }
        if self.by_name.contains_key(&name) {
            return Err(ToolError::Duplicate(name));
        }
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn execute(&self, name: &str, input: &Value) -> Result<ToolOutput, ToolError> {
        match self.by_name.get(name) {
            Some(&index) => self.tools[index].execute(input).await,
            None => Ok(ToolOutput::text(format!("Tool '{}' not found", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool(&'static str);

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.0.to_string(),
                description: "echo".to_string(),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::text(input.to_string()))
        }
    }

    #[tokio::test]
    async fn registers_and_dispatches_by_name() {
        let mut manager = ToolManager::new();
        manager.register(Arc::new(EchoTool("first"))).unwrap();
        manager.register(Arc::new(EchoTool("second"))).unwrap();

        let names: Vec<String> = manager.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["first", "second"]);

        let output = manager.execute("second", &json!({"q": 1})).await.unwrap();
        assert_eq!(output.text, r#"{"q":1}"#);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_as_text() {
        let manager = ToolManager::new();
        let output = manager.execute("missing", &json!({})).await.unwrap();
        assert_eq!(output.text, "Tool 'missing' not found");
        assert!(output.sources.is_empty());
    }

    #[test]
    fn rejects_duplicate_and_empty_names() {
        let mut manager = ToolManager::new();
        manager.register(Arc::new(EchoTool("dup"))).unwrap();
        assert!(matches!(
            manager.register(Arc::new(EchoTool("dup"))),
            Err(ToolError::Duplicate(name)) if name == "dup"
        ));
        assert!(matches!(
            manager.register(Arc::new(EchoTool("  "))),
            Err(ToolError::MissingName)
        ));
    }
}
