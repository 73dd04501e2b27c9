use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::llm::{AnthropicProvider, LlmError, LlmProvider, UnconfiguredProvider};
use crate::rag::RagSystem;
use crate::vector::{build_embedder, CourseStore, SqliteCourseStore};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Arc<Settings>,
    pub rag: Arc<RagSystem>,
    /// `None` when `server.query_rate_limit_per_minute` is 0.
    pub query_limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// 1. Loads and validates configuration
    /// 2. Opens the SQLite course store with the configured embedder
    /// 3. Builds the Anthropic provider (or a placeholder without an API key)
    /// 4. Wires the RAG system and the query rate limiter
    pub async fn initialize(config: ConfigService) -> Result<Arc<Self>, InitializationError> {
        let paths = config.paths();
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let embedder = build_embedder(&settings.embedding)
            .map_err(|e| InitializationError::Embedding(e.into()))?;
        let store = SqliteCourseStore::open(&paths.db_path, embedder, settings.search.max_results)
            .await
            .map_err(|e| InitializationError::Store(e.into()))?;

        let provider: Arc<dyn LlmProvider> = match AnthropicProvider::new(&settings.llm) {
            Ok(provider) => Arc::new(provider),
            Err(LlmError::MissingApiKey) => {
                tracing::warn!(
                    "ANTHROPIC_API_KEY is not set; queries will fail until it is configured"
                );
                Arc::new(UnconfiguredProvider)
            }
            Err(e) => return Err(InitializationError::Llm(e.into())),
        };

        Ok(Arc::new(Self::new(paths, settings, Arc::new(store), provider)?))
    }

    pub fn new(
        paths: Arc<AppPaths>,
        settings: Settings,
        store: Arc<dyn CourseStore>,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Self, InitializationError> {
        let rag = RagSystem::new(&settings, store, provider)
            .map_err(|e| InitializationError::Rag(e.into()))?;
        let query_limiter = NonZeroU32::new(settings.server.query_rate_limit_per_minute)
            .map(|per_minute| Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))));

        Ok(Self {
            paths,
            settings: Arc::new(settings),
            rag: Arc::new(rag),
            query_limiter,
        })
    }
}
