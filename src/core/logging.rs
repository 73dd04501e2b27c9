use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

/// Server default when `RUST_LOG` is unset. sqlx logs every statement at info.
const SERVER_FILTER: &str = "info,sqlx=warn,hyper=warn";
const LOG_FILE_PREFIX: &str = "course-rag.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Server logging: stdout plus a daily-rolling file under `paths.log_dir`.
pub fn init(paths: &AppPaths) {
    let _ = std::fs::create_dir_all(&paths.log_dir);

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&paths.log_dir, LOG_FILE_PREFIX));
    let _ = LOG_GUARD.set(guard);

    let _ = tracing_subscriber::registry()
        .with(filter_or(SERVER_FILTER))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init();
}

/// Client logging: stderr only, so stdout stays reserved for the transcript.
pub fn init_stderr(default: &str) {
    let _ = tracing_subscriber::registry()
        .with(filter_or(default))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
