use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Tool, ToolError, ToolOutput};
use crate::core::errors::ApiError;
use crate::llm::ToolDefinition;
use crate::rag::Source;
use crate::vector::CourseStore;

pub const OUTLINE_TOOL_NAME: &str = "get_course_outline";

#[derive(Debug, Deserialize)]
struct OutlineInput {
    course_name: String,
}

pub struct CourseOutlineTool {
    store: Arc<dyn CourseStore>,
}

impl CourseOutlineTool {
    pub fn new(store: Arc<dyn CourseStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: OUTLINE_TOOL_NAME.to_string(),
            description: "Get course structure, lesson list, titles, and navigation info. Use this to understand WHAT lessons exist and course organization, NOT to search content within lessons.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title or partial course name to get outline for"
                    }
                },
                "required": ["course_name"]
            }),
        }
    }

    async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError> {
        let input: OutlineInput = serde_json::from_value(input.clone())
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        let title = match self.store.resolve_course_name(&input.course_name).await {
            Ok(Some(title)) => title,
            Ok(None) => {
                return Ok(ToolOutput::text(format!(
                    "No course found matching '{}'",
                    input.course_name
                )))
            }
            Err(err) => return Ok(retrieval_error(err)),
        };
        let course = match self.store.get_course(&title).await {
            Ok(Some(course)) => course,
            Ok(None) => {
                return Ok(ToolOutput::text(format!(
                    "Course metadata not found for '{}'",
                    title
                )))
            }
            Err(err) => return Ok(retrieval_error(err)),
        };
        if course.lessons.is_empty() {
            return Ok(ToolOutput::text(format!(
                "No lesson information available for '{}'",
                title
            )));
        }

        let mut lessons = course.lessons.clone();
        lessons.sort_by_key(|lesson| lesson.lesson_number);

        let mut text = format!("**{}**\n", course.title);
        if let Some(link) = &course.course_link {
            text.push_str(&format!("Course Link: {}\n", link));
        }
        text.push_str(&format!("\n**Lessons ({} total):**\n", lessons.len()));
        for lesson in &lessons {
            text.push_str(&format!("{}. {}\n", lesson.lesson_number, lesson.title));
        }

        Ok(ToolOutput {
            text,
            sources: vec![Source::new(
                format!("{} - Course Outline", course.title),
                course.course_link.clone(),
            )],
        })
    }
}

/// Store failures are reported to the model as tool text, not raised.
fn retrieval_error(err: ApiError) -> ToolOutput {
    tracing::warn!("Course outline lookup failed: {}", err);
    ToolOutput::text(format!("Error retrieving course outline: {}", err))
}
