use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::transcode_service::TranscodeError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No file uploaded!")]
    NoFileUploaded,

    #[error("Failed to get video duration!")]
    DurationUnavailable,

    #[error("Processing timeout!")]
    ProcessingTimeout,

    #[error("FFmpeg failed or output file is empty!")]
    TransformFailed,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map a multipart read failure, distinguishing the body limit.
    pub fn from_multipart(err: &MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
        } else {
            AppError::BadRequest(err.body_text())
        }
    }
}

impl From<TranscodeError> for AppError {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::DurationUnavailable => AppError::DurationUnavailable,
            TranscodeError::Timeout(_) => AppError::ProcessingTimeout,
            TranscodeError::TransformFailed { .. } => AppError::TransformFailed,
            // Upload stream failures reach us wrapped in io::Error
            TranscodeError::Io(e) => match e
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<MultipartError>())
            {
                Some(multipart) => AppError::from_multipart(multipart),
                None => AppError::Internal(format!("Temp file error: {}", e)),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NoFileUploaded => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::DurationUnavailable
            | AppError::ProcessingTimeout
            | AppError::TransformFailed => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
