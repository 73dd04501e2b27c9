use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Tool, ToolError, ToolOutput};
use crate::llm::ToolDefinition;
use crate::rag::Source;
use crate::vector::{CourseStore, SearchQuery, SearchResults};

pub const SEARCH_TOOL_NAME: &str = "search_course_content";

#[derive(Debug, Deserialize)]
struct SearchInput {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default)]
    lesson_number: Option<u32>,
}

pub struct CourseSearchTool {
    store: Arc<dyn CourseStore>,
}

impl CourseSearchTool {
    pub fn new(store: Arc<dyn CourseStore>) -> Self {
        Self { store }
    }

    async fn format_results(&self, results: &SearchResults) -> ToolOutput {
        let mut blocks = Vec::with_capacity(results.hits.len());
        let mut sources: Vec<Source> = Vec::new();

        for hit in &results.hits {
            let chunk = &hit.chunk;
            let label = match chunk.lesson_number {
                Some(n) => format!("{} - Lesson {}", chunk.course_title, n),
                None => chunk.course_title.clone(),
            };

            let link = match chunk.lesson_number {
                Some(n) => match self.store.get_lesson_link(&chunk.course_title, n).await {
                    Ok(link) => link,
                    Err(err) => {
                        tracing::warn!("Lesson link lookup failed for {}: {}", label, err);
                        None
                    }
                },
                None => None,
            };

            blocks.push(format!("[{}]\n{}", label, chunk.content));
            let source = Source::new(label, link);
            if !sources.contains(&source) {
                sources.push(source);
            }
        }

        ToolOutput {
            text: blocks.join("\n\n"),
            sources,
        }
    }
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: SEARCH_TOOL_NAME.to_string(),
            description: "Search inside course materials for specific content, topics, concepts, or explanations. Use this to find detailed information WITHIN lessons.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError> {
        let input: SearchInput = serde_json::from_value(input.clone())
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let course_name = input
            .course_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        let results = self
            .store
            .search(SearchQuery {
                query: &input.query,
                course_name,
                lesson_number: input.lesson_number,
                limit: None,
            })
            .await;

        if let Some(error) = &results.error {
            return Ok(ToolOutput::text(error.clone()));
        }

        if results.is_empty() {
            let mut filter_info = String::new();
            if let Some(name) = course_name {
                filter_info.push_str(&format!(" in course '{}'", name));
            }
            if let Some(n) = input.lesson_number {
                filter_info.push_str(&format!(" in lesson {}", n));
            }
            return Ok(ToolOutput::text(format!(
                "No relevant content found{}.",
                filter_info
            )));
        }

        Ok(self.format_results(&results).await)
    }
}
