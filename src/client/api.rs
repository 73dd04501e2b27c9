use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::failure::ChatFailure;
use crate::rag::{ClearSessionRequest, CourseAnalytics, QueryRequest, QueryResponse, Source};

/// HTTP client for the course assistant API.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ChatFailure> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatFailure::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn query(
        &self,
        query: &str,
        session_id: Option<&str>,
    ) -> Result<QueryResponse, ChatFailure> {
        let body = QueryRequest {
            query: query.to_string(),
            session_id: session_id.map(str::to_string),
        };
        let text = self.post("/api/query", &body).await?;
        parse_query_response(&text)
    }

    pub async fn courses(&self) -> Result<CourseAnalytics, ChatFailure> {
        let res = self
            .client
            .get(format!("{}/api/courses", self.base_url))
            .send()
            .await
            .map_err(|e| ChatFailure::Network(e.to_string()))?;
        let text = read_body(res).await?;
        serde_json::from_str(&text).map_err(|e| ChatFailure::MalformedJson(e.to_string()))
    }

    pub async fn clear_session(&self, session_id: &str) -> Result<(), ChatFailure> {
        let body = ClearSessionRequest {
            session_id: Some(session_id.to_string()),
        };
        self.post("/api/clear-session", &body)
            .await
            .map(|_| ())
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<String, ChatFailure> {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| ChatFailure::Network(e.to_string()))?;
        read_body(res).await
    }
}

async fn read_body(res: reqwest::Response) -> Result<String, ChatFailure> {
    let status = res.status();
    let text = res
        .text()
        .await
        .map_err(|e| ChatFailure::Network(e.to_string()))?;

    if !status.is_success() {
        return Err(ChatFailure::Http {
            status: status.as_u16(),
            detail: error_detail(&text),
        });
    }
    Ok(text)
}

fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Validates the query payload field by field so each failure is distinguishable.
pub fn parse_query_response(body: &str) -> Result<QueryResponse, ChatFailure> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ChatFailure::MalformedJson(e.to_string()))?;

    let answer = value
        .get("answer")
        .and_then(Value::as_str)
        .ok_or(ChatFailure::MissingField("answer"))?
        .to_string();
    let session_id = value
        .get("session_id")
        .and_then(Value::as_str)
        .ok_or(ChatFailure::MissingField("session_id"))?
        .to_string();
    let sources = match value.get("sources") {
        None | Some(Value::Null) => Vec::new(),
        Some(raw) => serde_json::from_value::<Vec<Source>>(raw.clone())
            .map_err(|e| ChatFailure::MalformedJson(e.to_string()))?,
    };

    Ok(QueryResponse {
        answer,
        sources,
        session_id,
    })
}
