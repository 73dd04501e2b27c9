use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{courses, health, query};
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// This function sets up:
/// - CORS middleware
/// - Health check endpoint
/// - API endpoints (query, courses, clear-session)
/// - Static frontend served from `/` with caching disabled
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_allowed_origins);
    let frontend = frontend_service(&state);

    Router::new()
        .route("/health", get(health::health))
        .route("/api/query", post(query::query))
        .route("/api/courses", get(courses::get_course_stats))
        .route("/api/clear-session", post(query::clear_session))
        .with_state(state)
        .fallback_service(frontend)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

/// The frontend is edited in place during development; never let the
/// browser reuse a stale copy.
fn frontend_service(state: &AppState) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(&state.paths.frontend_dir))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
}

fn build_cors_layer(configured: &[String]) -> CorsLayer {
    let allow_origin = if configured.iter().any(|origin| origin.trim() == "*") {
        AllowOrigin::any()
    } else {
        let origins = resolve_allowed_origins(configured)
            .into_iter()
            .filter_map(|origin| HeaderValue::from_str(&origin).ok())
            .collect::<Vec<_>>();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins = configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins();
    }

    origins
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:8000".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:8000".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::core::config::{AppPaths, Settings};
    use crate::llm::{LlmError, LlmProvider};
    use crate::test_support::{seeded_store, text_response, ScriptedProvider};

    async fn app_with(
        dir: &tempfile::TempDir,
        provider: Arc<dyn LlmProvider>,
        settings: Settings,
    ) -> Router {
        let paths = AppPaths::with_dirs(dir.path().to_path_buf(), dir.path().join("data"));
        std::fs::create_dir_all(&paths.frontend_dir).unwrap();
        std::fs::write(
            paths.frontend_dir.join("index.html"),
            "<html><body>Course Materials Assistant</body></html>",
        )
        .unwrap();

        let state = AppState::new(Arc::new(paths), settings, seeded_store(dir).await, provider)
            .unwrap();
        router(Arc::new(state))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn query_returns_answer_and_new_session() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(text_response("An answer"))]));
        let app = app_with(&dir, provider, Settings::default()).await;

        let response = app
            .oneshot(post_json(
                "/api/query",
                json!({"query": "What is MCP?", "session_id": null}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["answer"], "An answer");
        assert!(body["sources"].as_array().unwrap().is_empty());
        assert!(!body["session_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn courses_total_matches_titles() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(&dir, Arc::new(ScriptedProvider::default()), Settings::default()).await;

        let response = app
            .oneshot(Request::get("/api/courses").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total_courses"], 2);
        assert_eq!(body["course_titles"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn clear_session_without_id_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(&dir, Arc::new(ScriptedProvider::default()), Settings::default()).await;

        for body in [json!({"session_id": null}), json!({}), json!({"session_id": "unknown"})] {
            let response = app
                .clone()
                .oneshot(post_json("/api/clear-session", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await["success"], true);
        }
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(&dir, Arc::new(ScriptedProvider::default()), Settings::default()).await;

        let response = app
            .oneshot(post_json("/api/query", json!({"session_id": "abc"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].is_string());
        assert_eq!(body["error"], body["detail"]);
    }

    #[tokio::test]
    async fn provider_failures_surface_as_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(LlmError::CreditExhausted("credit balance is too low".into())),
            Err(LlmError::RateLimited("slow down".into())),
            Err(LlmError::InvalidRequest("bad".into())),
        ]));
        let app = app_with(&dir, provider, Settings::default()).await;

        for expected in [
            StatusCode::PAYMENT_REQUIRED,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::BAD_REQUEST,
        ] {
            let response = app
                .clone()
                .oneshot(post_json("/api/query", json!({"query": "hi"})))
                .await
                .unwrap();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn local_rate_limit_returns_429() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.server.query_rate_limit_per_minute = 1;
        let app = app_with(&dir, Arc::new(ScriptedProvider::default()), settings).await;

        let first = app
            .clone()
            .oneshot(post_json("/api/query", json!({"query": "one"})))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(post_json("/api/query", json!({"query": "two"})))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn health_reports_course_count() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(&dir, Arc::new(ScriptedProvider::default()), Settings::default()).await;

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await, json!({"status": "ok", "courses": 2}));
    }

    #[tokio::test]
    async fn frontend_is_served_without_caching() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(&dir, Arc::new(ScriptedProvider::default()), Settings::default()).await;

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("Course Materials Assistant"));
    }

    #[test]
    fn empty_origin_list_falls_back_to_local_defaults() {
        assert_eq!(resolve_allowed_origins(&[]), default_local_origins());
        assert_eq!(
            resolve_allowed_origins(&[" https://a.example ".to_string(), String::new()]),
            vec!["https://a.example".to_string()]
        );
    }
}
