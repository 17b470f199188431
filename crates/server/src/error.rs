use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pipeline::PipelineError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Not Found: {0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ApiError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let error_message = match &self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => msg.clone(),
            _ => self.to_string(),
        };

        if status_code.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        (status_code, Json(json!({ "error": error_message }))).into_response()
    }
}
