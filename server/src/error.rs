use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use docform::{RegistryError, StorageError};

use crate::types::ErrorResponse;

/// Errors surfaced to API clients as `{"detail": ...}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Only DOCX and PDF files are supported")]
    InvalidFileType,

    #[error("{0}")]
    InvalidUpload(String),

    #[error("Job not found")]
    JobNotFound,

    #[error("File not found")]
    FileNotFound,

    #[error("Job processing not completed")]
    JobNotCompleted,

    #[error("Internal server error: {0}")]
    Server(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidFileType | ApiError::InvalidUpload(_) | ApiError::JobNotCompleted => {
                StatusCode::BAD_REQUEST
            }
            ApiError::JobNotFound | ApiError::FileNotFound => StatusCode::NOT_FOUND,
            ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Storage errors carry absolute paths, which stay in the server log.
impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidFilename(name) => {
                ApiError::InvalidUpload(format!("Invalid filename: {:?}", name))
            }
            other => {
                tracing::error!("Storage failure: {}", other);
                ApiError::Server("Storage operation failed".to_string())
            }
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::JobNotFound(_) => ApiError::JobNotFound,
            other => ApiError::Server(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Server(format!("Background task failed: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
