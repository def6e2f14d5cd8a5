/// Unified error types for the photo catalog
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the catalog service
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Blob storage errors (probe, list, read, write or delete failures)
    #[error("Blob storage error: {0}")]
    BlobStorage(String),

    /// Structurally invalid requests
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate photo id)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// The caller's deadline expired before the operation finished
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert CatalogError to HTTP response
impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let detail = self.to_string();
        let (status, error_code, message) = match self {
            CatalogError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            CatalogError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            CatalogError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            CatalogError::Authorization(_) => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                self.to_string(),
            ),
            CatalogError::DeadlineExceeded => (
                StatusCode::GATEWAY_TIMEOUT,
                "DeadlineExceeded",
                self.to_string(),
            ),
            CatalogError::Database(_) | CatalogError::Internal(_) | CatalogError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
            CatalogError::BlobStorage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "BlobStorageError",
                self.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error_code, "request_failed: {}", detail);
        }

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
