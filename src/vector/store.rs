//! CourseStore trait: the two-collection vector store behind the RAG pipeline.
//!
//! - catalog: one entry per course (title, instructor, links, lessons)
//! - content: one entry per `CourseChunk`, searchable by similarity

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::documents::{Course, CourseChunk};

/// A chunk returned by similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: CourseChunk,
    /// Cosine distance (lower = closer).
    pub distance: f32,
}

/// Outcome of a content search. Failures are carried as a message rather than
/// an `Err` so the search tool can hand them to the model verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub error: Option<String>,
}

impl SearchResults {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits, error: None }
    }

    pub fn empty(error: impl Into<String>) -> Self {
        Self {
            hits: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery<'a> {
    pub query: &'a str,
    /// Free-form course name, resolved against the catalog.
    pub course_name: Option<&'a str>,
    pub lesson_number: Option<u32>,
    /// Overrides the store's configured maximum.
    pub limit: Option<usize>,
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Stores a course's catalog entry and its chunks together: either both
    /// land or neither does.
    async fn add_course(&self, course: &Course, chunks: &[CourseChunk]) -> Result<(), ApiError>;

    async fn add_course_metadata(&self, course: &Course) -> Result<(), ApiError>;

    async fn add_course_content(&self, chunks: &[CourseChunk]) -> Result<(), ApiError>;

    async fn search(&self, query: SearchQuery<'_>) -> SearchResults;

    /// Maps a partial or approximate course name to a stored title.
    async fn resolve_course_name(&self, course_name: &str) -> Result<Option<String>, ApiError>;

    async fn get_course(&self, title: &str) -> Result<Option<Course>, ApiError>;

    async fn get_existing_course_titles(&self) -> Result<Vec<String>, ApiError>;

    async fn get_course_count(&self) -> Result<usize, ApiError>;

    async fn get_chunk_count(&self) -> Result<usize, ApiError>;

    async fn clear_all_data(&self) -> Result<(), ApiError>;

    async fn get_lesson_link(
        &self,
        course_title: &str,
        lesson_number: u32,
    ) -> Result<Option<String>, ApiError> {
        Ok(self
            .get_course(course_title)
            .await?
            .and_then(|course| course.lesson(lesson_number).and_then(|l| l.lesson_link.clone())))
    }
}
