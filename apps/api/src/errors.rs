use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ranking::orchestrator::RankError;

pub const EMPTY_BATCH_MESSAGE: &str =
    "No valid resumes could be processed. Please check file formats and content.";

/// Request-level error type. Only validation failures, an empty batch, storage access
/// and unexpected faults abort a whole request; per-resume problems never reach here.
///
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{}", EMPTY_BATCH_MESSAGE)]
    EmptyBatch,

    #[error("Error fetching from S3: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::EmptyBatch => StatusCode::BAD_REQUEST,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::EmptyBatch => "EMPTY_BATCH",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The `{success: false, error, code}` body shared by the HTTP and Lambda surfaces.
    pub fn body(&self) -> serde_json::Value {
        let message = match self {
            AppError::Internal(_) => "An internal server error occurred".to_string(),
            other => other.to_string(),
        };
        json!({
            "success": false,
            "error": message,
            "code": self.code(),
        })
    }
}

impl From<RankError> for AppError {
    fn from(err: RankError) -> Self {
        match err {
            RankError::EmptyBatch { .. } => AppError::EmptyBatch,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Validation(msg) => tracing::warn!("Invalid request: {msg}"),
            AppError::EmptyBatch => tracing::warn!("Batch produced no rankable resumes"),
            AppError::Storage(msg) => tracing::error!("Storage error: {msg}"),
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
        }

        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_is_bad_request_with_message() {
        let err = AppError::validation("No resumes provided");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let body = err.body();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "No resumes provided");
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[test]
    fn test_empty_batch_is_distinct_from_validation() {
        let err: AppError = RankError::EmptyBatch { submitted: 3 }.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body()["code"], "EMPTY_BATCH");
        assert_eq!(err.body()["error"], EMPTY_BATCH_MESSAGE);
    }

    #[test]
    fn test_internal_error_hides_details() {
        let err = AppError::Internal(anyhow::anyhow!("secret path /var/data"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.body()["error"].as_str().unwrap().contains("/var/data"));
    }
}
