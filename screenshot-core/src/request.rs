//! Screenshot request and response records.

use crate::error::ScreenshotError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Body of `POST /screenshot`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScreenshotRequest {
    /// Page to render.
    #[validate(length(min = 1, message = "URL is required"))]
    pub url: String,

    /// Capture budget in seconds. Absent or `0` means the service default.
    #[serde(default)]
    #[validate(range(max = 300, message = "timeout must be at most 300 seconds"))]
    pub timeout: Option<u64>,
}

impl ScreenshotRequest {
    /// Check the request and return the parsed target URL.
    pub fn validate_input(&self) -> Result<Url, ScreenshotError> {
        self.validate()
            .map_err(|e| ScreenshotError::InvalidInput(e.to_string()))?;

        // Url::parse silently strips these; reject them instead
        if self.url.trim() != self.url || self.url.chars().any(|c| c.is_control()) {
            return Err(ScreenshotError::InvalidInput(
                "invalid URL: surrounding whitespace or control characters".to_string(),
            ));
        }

        let url = Url::parse(&self.url)
            .map_err(|e| ScreenshotError::InvalidInput(format!("invalid URL: {}", e)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ScreenshotError::InvalidInput(format!(
                "invalid URL: unsupported scheme '{}'",
                other
            ))),
        }
    }

    /// Effective capture budget.
    pub fn timeout(&self, default: Duration) -> Duration {
        match self.timeout {
            None | Some(0) => default,
            Some(secs) => Duration::from_secs(secs),
        }
    }
}

/// Body returned for every `/screenshot` exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotResponse {
    pub file_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScreenshotResponse {
    pub fn success(file_path: String) -> Self {
        Self {
            file_path,
            error: None,
        }
    }

    pub fn failure(file_path: String, error: &ScreenshotError) -> Self {
        Self {
            file_path,
            error: Some(error.to_string()),
        }
    }
}
