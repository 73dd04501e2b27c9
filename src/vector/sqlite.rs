//! SQLite-backed course store.
//!
//! In-process vector store using SQLite for metadata and
//! brute-force cosine similarity for search.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::embedding::Embedder;
use super::store::{CourseStore, SearchHit, SearchQuery, SearchResults};
use crate::core::errors::ApiError;
use crate::documents::{Course, CourseChunk, Lesson};

/// Minimum similarity for a semantic course-name match.
const MIN_COURSE_MATCH_SCORE: f32 = 0.25;
const EMBED_BATCH_SIZE: usize = 64;

pub struct SqliteCourseStore {
    pool: SqlitePool,
    embedder: Box<dyn Embedder>,
    max_results: usize,
    db_path: PathBuf,
}

impl SqliteCourseStore {
    pub async fn open(
        db_path: &Path,
        embedder: Box<dyn Embedder>,
        max_results: usize,
    ) -> Result<Self, ApiError> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self {
            pool,
            embedder,
            max_results: max_results.max(1),
            db_path: db_path.to_path_buf(),
        };
        store.init_schema().await?;
        store.ensure_embedding_model().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS course_catalog (
                title TEXT PRIMARY KEY,
                instructor TEXT,
                course_link TEXT,
                lessons_json TEXT NOT NULL DEFAULT '[]',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS course_content (
                chunk_id TEXT PRIMARY KEY,
                course_title TEXT NOT NULL,
                lesson_number INTEGER,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_content_course ON course_content(course_title, lesson_number)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS store_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    /// Vectors from another embedding model are meaningless; drop them.
    async fn ensure_embedding_model(&self) -> Result<(), ApiError> {
        let model = self.embedder.model_name();
        let stored: Option<String> =
            sqlx::query_scalar("SELECT value FROM store_meta WHERE key = 'embedding_model'")
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::internal)?;

        if stored.as_deref() == Some(model.as_str()) {
            return Ok(());
        }

        if let Some(previous) = stored {
            tracing::warn!(
                "Embedding model changed ({} -> {}), clearing stored courses",
                previous,
                model
            );
            self.clear_all_data().await?;
        }

        sqlx::query(
            "INSERT OR REPLACE INTO store_meta (key, value, updated_at)
             VALUES ('embedding_model', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(&model)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        self.embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("Embedder returned no vector".to_string()))
    }

    async fn embed_chunks(&self, chunks: &[CourseChunk]) -> Result<Vec<Vec<f32>>, ApiError> {
        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(CourseChunk::embedding_text).collect();
            embeddings.extend(self.embedder.embed(&texts).await?);
        }
        if embeddings.len() != chunks.len() {
            return Err(ApiError::Internal(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }

    async fn insert_course(
        conn: &mut SqliteConnection,
        course: &Course,
        embedding: &[f32],
    ) -> Result<(), ApiError> {
        let lessons_json = serde_json::to_string(&course.lessons).map_err(ApiError::internal)?;

        sqlx::query(
            "INSERT OR REPLACE INTO course_catalog (title, instructor, course_link, lessons_json, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&course.title)
        .bind(&course.instructor)
        .bind(&course.course_link)
        .bind(&lessons_json)
        .bind(Self::serialize_embedding(embedding))
        .execute(&mut *conn)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    async fn insert_chunks(
        conn: &mut SqliteConnection,
        chunks: &[CourseChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), ApiError> {
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            sqlx::query(
                "INSERT OR REPLACE INTO course_content (chunk_id, course_title, lesson_number, chunk_index, content, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(chunk.chunk_id())
            .bind(&chunk.course_title)
            .bind(chunk.lesson_number.map(i64::from))
            .bind(chunk.chunk_index as i64)
            .bind(&chunk.content)
            .bind(Self::serialize_embedding(embedding))
            .execute(&mut *conn)
            .await
            .map_err(ApiError::internal)?;
        }
        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> CourseChunk {
        let lesson_number: Option<i64> = row.get("lesson_number");
        let chunk_index: i64 = row.get("chunk_index");
        CourseChunk {
            content: row.get("content"),
            course_title: row.get("course_title"),
            lesson_number: lesson_number.and_then(|n| u32::try_from(n).ok()),
            chunk_index: chunk_index.max(0) as usize,
        }
    }

    fn row_to_course(row: &sqlx::sqlite::SqliteRow) -> Course {
        let lessons_json: String = row.get("lessons_json");
        let lessons = serde_json::from_str::<Vec<Lesson>>(&lessons_json).unwrap_or_default();
        Course {
            title: row.get("title"),
            instructor: row.get("instructor"),
            course_link: row.get("course_link"),
            lessons,
        }
    }

    async fn search_content(&self, query: &SearchQuery<'_>) -> Result<SearchResults, ApiError> {
        let course_title = match query.course_name {
            Some(name) => match self.resolve_course_name(name).await? {
                Some(title) => Some(title),
                None => return Ok(SearchResults::empty(format!("No course found matching '{}'", name))),
            },
            None => None,
        };

        let query_embedding = self.embed_one(query.query).await?;

        let mut sql = String::from(
            "SELECT course_title, lesson_number, chunk_index, content, embedding FROM course_content",
        );
        let mut clauses = Vec::new();
        if course_title.is_some() {
            clauses.push("course_title = ?");
        }
        if query.lesson_number.is_some() {
            clauses.push("lesson_number = ?");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let mut statement = sqlx::query(&sql);
        if let Some(title) = &course_title {
            statement = statement.bind(title);
        }
        if let Some(number) = query.lesson_number {
            statement = statement.bind(i64::from(number));
        }

        let rows = statement
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        let mut scored: Vec<(f32, CourseChunk)> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Option<Vec<u8>> = row.get("embedding");
                let embedding_bytes = embedding_bytes.filter(|b| !b.is_empty())?;
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(&query_embedding, &stored);
                Some((score, Self::row_to_chunk(row)))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(query.limit.unwrap_or(self.max_results).max(1));

        Ok(SearchResults::new(
            scored
                .into_iter()
                .map(|(score, chunk)| SearchHit {
                    chunk,
                    distance: 1.0 - score,
                })
                .collect(),
        ))
    }
}

#[async_trait]
impl CourseStore for SqliteCourseStore {
    async fn add_course(&self, course: &Course, chunks: &[CourseChunk]) -> Result<(), ApiError> {
        // Embed everything up front so a failing embedder leaves nothing behind.
        let title_embedding = self.embed_one(&course.title).await?;
        let chunk_embeddings = self.embed_chunks(chunks).await?;

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        Self::insert_course(&mut tx, course, &title_embedding).await?;
        Self::insert_chunks(&mut tx, chunks, &chunk_embeddings).await?;
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn add_course_metadata(&self, course: &Course) -> Result<(), ApiError> {
        let embedding = self.embed_one(&course.title).await?;
        let mut conn = self.pool.acquire().await.map_err(ApiError::internal)?;
        Self::insert_course(&mut conn, course, &embedding).await
    }

    async fn add_course_content(&self, chunks: &[CourseChunk]) -> Result<(), ApiError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let embeddings = self.embed_chunks(chunks).await?;
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        Self::insert_chunks(&mut tx, chunks, &embeddings).await?;
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn search(&self, query: SearchQuery<'_>) -> SearchResults {
        match self.search_content(&query).await {
            Ok(results) => results,
            Err(err) => {
                tracing::warn!("Search failed: {}", err);
                SearchResults::empty(format!("Search error: {}", err))
            }
        }
    }

    async fn resolve_course_name(&self, course_name: &str) -> Result<Option<String>, ApiError> {
        let needle = course_name.trim();
        if needle.is_empty() {
            return Ok(None);
        }

        let rows = sqlx::query("SELECT title, embedding FROM course_catalog ORDER BY title")
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        if rows.is_empty() {
            return Ok(None);
        }

        let lowered = needle.to_lowercase();
        let titles: Vec<String> = rows.iter().map(|row| row.get("title")).collect();

        if let Some(exact) = titles.iter().find(|t| t.to_lowercase() == lowered) {
            return Ok(Some(exact.clone()));
        }
        if let Some(partial) = titles.iter().find(|t| t.to_lowercase().contains(&lowered)) {
            return Ok(Some(partial.clone()));
        }

        let query_embedding = self.embed_one(needle).await?;
        let best = rows
            .iter()
            .zip(titles)
            .filter_map(|(row, title)| {
                let bytes: Option<Vec<u8>> = row.get("embedding");
                let stored = Self::deserialize_embedding(&bytes?);
                Some((Self::cosine_similarity(&query_embedding, &stored), title))
            })
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(best
            .filter(|(score, _)| *score >= MIN_COURSE_MATCH_SCORE)
            .map(|(_, title)| title))
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>, ApiError> {
        let row = sqlx::query(
            "SELECT title, instructor, course_link, lessons_json FROM course_catalog WHERE title = ?1",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(row.as_ref().map(Self::row_to_course))
    }

    async fn get_existing_course_titles(&self) -> Result<Vec<String>, ApiError> {
        sqlx::query_scalar("SELECT title FROM course_catalog ORDER BY created_at, title")
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)
    }

    async fn get_course_count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM course_catalog")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(count as usize)
    }

    async fn get_chunk_count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM course_content")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(count as usize)
    }

    async fn clear_all_data(&self) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        sqlx::query("DELETE FROM course_content")
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        sqlx::query("DELETE FROM course_catalog")
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }
}
