use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize embedder: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("Failed to initialize course store: {0}")]
    Store(#[source] anyhow::Error),

    #[error("Failed to initialize LLM provider: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to initialize RAG system: {0}")]
    Rag(#[source] anyhow::Error),
}
