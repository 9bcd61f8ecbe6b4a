use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kernel::ErrorResponse;
use thiserror::Error;

/// Whole-request failures. Everything else is reported per item inside
/// a 200 response so clients can render partial success.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Required backend configuration is missing or unusable
    #[error("storage backend is not available: {0}")]
    Config(String),
    /// A request precondition failed before any backend write
    #[error("{0}")]
    Validation(String),
    /// A single file exceeded the per-file size limit
    #[error("file '{name}' exceeds the {limit} byte per-file limit")]
    TooLarge { name: String, limit: u64 },
    /// The multipart body itself could not be read
    #[error("malformed multipart request: {0}")]
    Multipart(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("{self}");
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

/// Per-item failures raised by the upload executor. These never abort
/// the batch, the orchestrator folds them into failure results.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The item arrived without a readable byte source
    #[error("upload source is missing or unreadable")]
    MissingSource,
    /// The spooled temp file could not be read back
    #[error("reading upload source failed: {0}")]
    Source(#[from] std::io::Error),
    /// The backend rejected the write
    #[error("backend write failed: {0}")]
    BackendWrite(String),
    /// The backend stored the object but could not issue a URL for it
    #[error("resolving object URL failed: {0}")]
    UrlResolution(String),
}
