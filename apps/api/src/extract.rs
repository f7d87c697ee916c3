//! Request extractors whose rejections use the API error body.

use axum::extract::{rejection::JsonRejection, FromRequest};

use crate::errors::AppError;

/// `axum::Json` for request bodies, rejecting with `AppError` so malformed
/// JSON gets the same `{"error": {...}}` body as every other failure.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}
