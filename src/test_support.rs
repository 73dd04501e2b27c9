//! Shared fixtures for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::core::errors::ApiError;
use crate::documents::{Course, CourseChunk, Lesson};
use crate::llm::{
    ContentBlock, LlmError, LlmProvider, MessageRequest, MessageResponse, StopReason, Usage,
};
use crate::vector::{CourseStore, Embedder, HashEmbedder, SqliteCourseStore};

pub const SAMPLE_COURSE_DOCUMENT: &str = "Course Title: Building Towards Computer Use
Course Link: https://learn.example.com/computer-use
Course Instructor: Colt Steele

Lesson 0: Introduction
Lesson Link: https://learn.example.com/computer-use/lesson-0
Welcome to Building Towards Computer Use with Anthropic models.
Lesson 1: Prompt Caching
Lesson Link: https://learn.example.com/computer-use/lesson-1
Prompt caching stores a prompt prefix so repeated calls cost less.
";

pub fn sample_courses() -> Vec<(Course, Vec<CourseChunk>)> {
    let computer_use = Course {
        title: "Building Towards Computer Use".to_string(),
        instructor: Some("Colt Steele".to_string()),
        course_link: Some("https://learn.example.com/computer-use".to_string()),
        lessons: vec![
            Lesson {
                lesson_number: 1,
                title: "Prompt Caching".to_string(),
                lesson_link: Some("https://learn.example.com/computer-use/lesson-1".to_string()),
            },
            Lesson {
                lesson_number: 0,
                title: "Introduction".to_string(),
                lesson_link: Some("https://learn.example.com/computer-use/lesson-0".to_string()),
            },
        ],
    };
    let mcp = Course {
        title: "MCP: Build Rich-Context AI Apps".to_string(),
        instructor: Some("Elie Schoppik".to_string()),
        course_link: None,
        lessons: vec![Lesson {
            lesson_number: 1,
            title: "Why MCP".to_string(),
            lesson_link: None,
        }],
    };

    let chunk = |course: &Course, lesson: Option<u32>, index: usize, content: &str| CourseChunk {
        content: content.to_string(),
        course_title: course.title.clone(),
        lesson_number: lesson,
        chunk_index: index,
    };

    vec![
        (
            computer_use.clone(),
            vec![
                chunk(
                    &computer_use,
                    Some(0),
                    0,
                    "Welcome to Building Towards Computer Use with Anthropic models.",
                ),
                chunk(
                    &computer_use,
                    Some(1),
                    1,
                    "Prompt caching stores a prompt prefix so repeated calls cost less.",
                ),
            ],
        ),
        (
            mcp.clone(),
            vec![chunk(
                &mcp,
                Some(1),
                0,
                "MCP standardizes how applications expose tools and resources to models.",
            )],
        ),
    ]
}

pub async fn empty_store(dir: &tempfile::TempDir) -> Arc<dyn CourseStore> {
    let store = SqliteCourseStore::open(
        &dir.path().join("course_store.db"),
        Box::new(HashEmbedder::new(256)),
        5,
    )
    .await
    .unwrap();
    Arc::new(store)
}

pub async fn seeded_store(dir: &tempfile::TempDir) -> Arc<dyn CourseStore> {
    let store = empty_store(dir).await;
    for (course, chunks) in sample_courses() {
        store.add_course_metadata(&course).await.unwrap();
        store.add_course_content(&chunks).await.unwrap();
    }
    store
}

/// Hash embedder that rejects chunk text (`Course ... content: ...`) while
/// `failing` is set; course titles still embed.
pub struct FlakyEmbedder {
    inner: HashEmbedder,
    failing: Arc<AtomicBool>,
}

impl FlakyEmbedder {
    pub fn new(failing: Arc<AtomicBool>) -> Self {
        Self {
            inner: HashEmbedder::new(256),
            failing,
        }
    }
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    fn model_name(&self) -> String {
        self.inner.model_name()
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let chunk_text = inputs.iter().any(|input| input.starts_with("Course "));
        if chunk_text && self.failing.load(Ordering::SeqCst) {
            return Err(ApiError::Internal("embedding server unavailable".to_string()));
        }
        self.inner.embed(inputs).await
    }
}

pub fn text_response(text: &str) -> MessageResponse {
    MessageResponse {
        content: vec![ContentBlock::Text {
            text: text.to_string(),
        }],
        stop_reason: Some(StopReason::EndTurn),
        usage: Usage::default(),
    }
}

pub fn tool_use_response(id: &str, name: &str, input: Value) -> MessageResponse {
    MessageResponse {
        content: vec![ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }],
        stop_reason: Some(StopReason::ToolUse),
        usage: Usage::default(),
    }
}

/// Replays queued responses and records every request it receives.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<MessageResponse, LlmError>>>,
    requests: Mutex<Vec<MessageRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<MessageResponse, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<MessageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(text_response("scripted default answer")))
    }
}
