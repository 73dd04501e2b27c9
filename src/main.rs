use std::env;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use course_rag::core::config::{AppPaths, ConfigService};
use course_rag::core::logging;
use course_rag::server;
use course_rag::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let config = ConfigService::new(paths.clone());
    tracing::info!(
        "Effective configuration: {}",
        config.redact_sensitive_values(&config.load_config())
    );

    let state = AppState::initialize(config).await?;

    let docs_dir = paths.resolve(&state.settings.documents.docs_dir);
    match state.rag.add_course_folder(&docs_dir, false).await {
        Ok((courses, chunks)) => tracing::info!(
            "Loaded {} new courses with {} chunks from {}",
            courses,
            chunks,
            docs_dir.display()
        ),
        Err(err) => tracing::warn!(
            "Failed to load course documents from {}: {}",
            docs_dir.display(),
            err
        ),
    }

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(state.settings.server.port);
    let bind_addr = format!("{}:{}", state.settings.server.host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!("Listening on http://{}", addr);

    let app: Router = server::router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
