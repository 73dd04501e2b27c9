use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::rag::{ClearSessionRequest, QueryRequest, QueryResponse};
use crate::server::extract::ApiJson;
use crate::state::AppState;

pub async fn query(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    if let Some(limiter) = &state.query_limiter {
        if limiter.check().is_err() {
            return Err(ApiError::TooManyRequests(
                "Too many queries, please wait a moment and try again".to_string(),
            ));
        }
    }

    let response = state.rag.query(&payload.query, payload.session_id).await?;
    Ok(Json(response))
}

pub async fn clear_session(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ClearSessionRequest>,
) -> Result<Json<Value>, ApiError> {
    let cleared = state.rag.clear_session(payload.session_id.as_deref()).await;
    let message = if cleared {
        "Session cleared successfully"
    } else {
        "No active session to clear"
    };
    Ok(Json(json!({"success": true, "message": message})))
}
