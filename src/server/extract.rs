use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;

use crate::core::errors::ApiError;

/// `axum::Json` whose rejections render as the standard 400 error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
