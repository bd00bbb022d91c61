use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Human-readable description of what went wrong.
    pub error: String,
    /// HTTP status code, repeated for clients that only see the body.
    pub code: u16,
}

#[derive(Error, Debug)]
pub enum ScanlineError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Upload too large: {0}")]
    UploadTooLarge(String),

    #[error("Scratch write failed: {0}")]
    StorageWrite(String),

    #[error("Unreadable image: {0}")]
    UnreadableImage(String),

    #[error("OCR engine error: {0}")]
    Engine(String),

    #[error("OCR unavailable: {0}")]
    EngineUnavailable(String),

    #[error("OCR timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ScanlineError {
    pub fn status(&self) -> StatusCode {
        match self {
            ScanlineError::Input(_) => StatusCode::BAD_REQUEST,
            ScanlineError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ScanlineError::UnreadableImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ScanlineError::StorageWrite(_)
            | ScanlineError::Engine(_)
            | ScanlineError::Io(_)
            | ScanlineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ScanlineError::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ScanlineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ScanlineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ScanlineError::Input(msg)
            | ScanlineError::UploadTooLarge(msg)
            | ScanlineError::UnreadableImage(msg)
            | ScanlineError::Engine(msg)
            | ScanlineError::EngineUnavailable(msg) => msg.clone(),
            ScanlineError::Timeout(_) => self.to_string(),
            // Paths and OS errors stay in the logs.
            ScanlineError::StorageWrite(_) => {
                tracing::error!(error = %self, "Failed to store upload");
                "Failed to store upload".to_string()
            }
            ScanlineError::Io(_) | ScanlineError::Internal(_) => {
                tracing::error!(error = %self, "Internal error while handling request");
                "An internal error occurred".to_string()
            }
        };

        let body = ErrorBody {
            error: message,
            code: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<MultipartRejection> for ScanlineError {
    fn from(rejection: MultipartRejection) -> Self {
        ScanlineError::Input(format!("Invalid multipart request: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for ScanlineError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ScanlineError::UploadTooLarge(err.body_text())
        } else {
            ScanlineError::Input(format!("Failed to read upload: {}", err.body_text()))
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanlineError>;
