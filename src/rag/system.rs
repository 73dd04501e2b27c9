//! RagSystem: ties the document processor, course store, tools, generator
//! and session history together.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::source::Source;
use crate::core::config::Settings;
use crate::core::errors::ApiError;
use crate::documents::{ChunkSettings, Course, DocumentProcessor, ProcessedDocument};
use crate::llm::{AiGenerator, LlmProvider};
use crate::session::SessionManager;
use crate::tools::{CourseOutlineTool, CourseSearchTool, ToolManager};
use crate::vector::CourseStore;

const SUPPORTED_EXTENSIONS: [&str; 2] = ["txt", "md"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

pub struct RagSystem {
    store: Arc<dyn CourseStore>,
    processor: DocumentProcessor,
    generator: AiGenerator,
    tools: ToolManager,
    sessions: SessionManager,
}

impl RagSystem {
    pub fn new(
        settings: &Settings,
        store: Arc<dyn CourseStore>,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Self, ApiError> {
        let chunking = ChunkSettings::new(
            settings.documents.chunk_size,
            settings.documents.chunk_overlap,
        )
        .map_err(ApiError::internal)?;

        let mut tools = ToolManager::new();
        tools
            .register(Arc::new(CourseSearchTool::new(store.clone())))
            .map_err(ApiError::internal)?;
        tools
            .register(Arc::new(CourseOutlineTool::new(store.clone())))
            .map_err(ApiError::internal)?;

        Ok(Self {
            store,
            processor: DocumentProcessor::new(chunking),
            generator: AiGenerator::new(provider, &settings.llm),
            tools,
            sessions: SessionManager::new(settings.session.max_history),
        })
    }

    pub fn store(&self) -> &Arc<dyn CourseStore> {
        &self.store
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub async fn query(
        &self,
        query: &str,
        session_id: Option<String>,
    ) -> Result<QueryResponse, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::BadRequest("Query must not be empty".to_string()));
        }

        let session_id = session_id.filter(|id| !id.trim().is_empty());
        let history = match &session_id {
            Some(id) => self.sessions.get_conversation_history(id).await,
            None => None,
        };
        let prompt = format!("Answer this question about course materials: {}", query);

        let answer = self
            .generator
            .generate(&prompt, history.as_deref(), Some(&self.tools))
            .await?;

        // Sessions are only opened once there is an exchange to record.
        let session_id = match session_id {
            Some(id) => id,
            None => self.sessions.create_session().await,
        };
        self.sessions
            .add_exchange(&session_id, query, &answer.text)
            .await;

        tracing::info!(
            session = %session_id,
            sources = answer.sources.len(),
            "Answered query via {}",
            self.generator.provider_name()
        );

        Ok(QueryResponse {
            answer: answer.text,
            sources: answer.sources,
            session_id,
        })
    }

    /// Missing or empty ids are accepted and ignored.
    pub async fn clear_session(&self, session_id: Option<&str>) -> bool {
        match session_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => self.sessions.clear_session(id).await,
            None => false,
        }
    }

    pub async fn add_course_document(&self, path: &Path) -> Result<(Course, usize), ApiError> {
        let document = self.load_document(path).await?;
        self.store_document(&document).await?;
        Ok((document.course, document.chunks.len()))
    }

    /// Ingests every supported file in `folder`, skipping courses already stored.
    pub async fn add_course_folder(
        &self,
        folder: &Path,
        clear_existing: bool,
    ) -> Result<(usize, usize), ApiError> {
        if clear_existing {
            tracing::info!("Clearing existing course data before ingestion");
            self.store.clear_all_data().await?;
        }

        if !folder.is_dir() {
            tracing::warn!("Course folder {} does not exist", folder.display());
            return Ok((0, 0));
        }

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(folder).await.map_err(ApiError::internal)?;
        while let Some(entry) = entries.next_entry().await.map_err(ApiError::internal)? {
            let path = entry.path();
            if path.is_file() && is_supported(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut existing: HashSet<String> = self
            .store
            .get_existing_course_titles()
            .await?
            .into_iter()
            .collect();

        let mut total_courses = 0;
        let mut total_chunks = 0;

        for path in paths {
            let document = match self.load_document(&path).await {
                Ok(document) => document,
                Err(err) => {
                    tracing::warn!("Skipping {}: {}", path.display(), err);
                    continue;
                }
            };

            if existing.contains(&document.course.title) {
                tracing::info!("Course already exists: {} - skipping", document.course.title);
                continue;
            }

            if let Err(err) = self.store_document(&document).await {
                tracing::warn!("Failed to store {}: {}", path.display(), err);
                continue;
            }

            tracing::info!(
                "Added new course: {} ({} chunks)",
                document.course.title,
                document.chunks.len()
            );
            total_courses += 1;
            total_chunks += document.chunks.len();
            existing.insert(document.course.title);
        }

        Ok((total_courses, total_chunks))
    }

    pub async fn course_analytics(&self) -> Result<CourseAnalytics, ApiError> {
        let course_titles = self.store.get_existing_course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    async fn load_document(&self, path: &Path) -> Result<ProcessedDocument, ApiError> {
        let bytes = tokio::fs::read(path).await.map_err(ApiError::internal)?;
        let content = String::from_utf8_lossy(&bytes);
        let source_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(self.processor.process(&source_name, &content))
    }

    async fn store_document(&self, document: &ProcessedDocument) -> Result<(), ApiError> {
        self.store
            .add_course(&document.course, &document.chunks)
            .await
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}
