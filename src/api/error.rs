//! API error responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::command::EnqueueError;
use crate::statusdata::LookupError;

/// Errors returned by API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    NotFound(#[from] LookupError),

    #[error("invalid request body: {0}")]
    BadRequest(#[from] serde_json::Error),

    #[error(transparent)]
    Enqueue(#[from] EnqueueError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Enqueue(EnqueueError::QueueFull) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Enqueue(EnqueueError::Closed) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
