//! Errors surfaced to HTTP callers.

use crate::request::ScreenshotResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong while handling `POST /screenshot`.
///
/// The `Display` text is returned verbatim in the response's `error` field.
#[derive(Debug, Error)]
pub enum ScreenshotError {
    /// Any method other than POST.
    #[error("Only POST method is allowed")]
    MethodNotAllowed,

    /// Body is not a JSON screenshot request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Request decoded but failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Output path could not be derived or its directory created.
    #[error("Failed to generate file name: {0}")]
    FileName(String),

    /// Browser failed to navigate or render.
    #[error("failed to take screenshot: {0}")]
    Capture(String),

    /// Capture did not finish within the request's budget.
    #[error("failed to take screenshot: timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// Image bytes could not be written to disk.
    #[error("failed to save screenshot: {0}")]
    Save(String),
}

impl ScreenshotError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::InvalidRequest(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::FileName(_) | Self::Capture(_) | Self::Timeout(_) | Self::Save(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Build the response for a failure that happened after the output path was known.
    pub fn into_response_with_path(self, file_path: String) -> Response {
        let status = self.status_code();
        (status, Json(ScreenshotResponse::failure(file_path, &self))).into_response()
    }
}

impl IntoResponse for ScreenshotError {
    fn into_response(self) -> Response {
        self.into_response_with_path(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ScreenshotError::MethodNotAllowed.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ScreenshotError::InvalidRequest("eof".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ScreenshotError::InvalidInput("URL is required".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ScreenshotError::Timeout(Duration::from_secs(30)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ScreenshotError::Save("disk full".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ScreenshotError::Timeout(Duration::from_secs(5)).to_string(),
            "failed to take screenshot: timed out after 5s"
        );
        assert_eq!(
            ScreenshotError::Timeout(Duration::from_millis(1500)).to_string(),
            "failed to take screenshot: timed out after 1.5s"
        );
        assert_eq!(
            ScreenshotError::InvalidInput("URL is required".into()).to_string(),
            "Invalid input: URL is required"
        );
    }
}
