use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let courses = state.rag.store().get_course_count().await?;
    Ok(Json(json!({
        "status": "ok",
        "courses": courses
    })))
}
