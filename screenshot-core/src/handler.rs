//! `POST /screenshot`: validate, name, capture, save, report.

use crate::browser::ScreenshotEngine;
use crate::config::ServiceConfig;
use crate::error::ScreenshotError;
use crate::naming::prepare_screenshot_path;
use crate::request::{ScreenshotRequest, ScreenshotResponse};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub engine: Arc<dyn ScreenshotEngine>,
}

impl AppState {
    pub fn new(config: ServiceConfig, engine: Arc<dyn ScreenshotEngine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }
}

/// Router exposing `/screenshot`. Methods other than POST get a JSON 405.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/screenshot",
            post(screenshot).fallback(method_not_allowed),
        )
        .with_state(state)
}

async fn method_not_allowed() -> ScreenshotError {
    tracing::warn!("Rejected non-POST request on /screenshot");
    ScreenshotError::MethodNotAllowed
}

/// Decode and validate a request body. Content-Type is not checked.
fn parse_request(body: &[u8]) -> Result<(ScreenshotRequest, Url), ScreenshotError> {
    let request: ScreenshotRequest = serde_json::from_slice(body)
        .map_err(|e| ScreenshotError::InvalidRequest(e.to_string()))?;
    let url = request.validate_input()?;
    Ok((request, url))
}

/// Run `engine` against `url` within `timeout` and write the image to `path`.
///
/// On timeout the capture future is dropped, which tears down its browser.
pub async fn capture_to_file(
    engine: &dyn ScreenshotEngine,
    url: &Url,
    path: &Path,
    timeout: Duration,
) -> Result<(), ScreenshotError> {
    let bytes = match tokio::time::timeout(timeout, engine.capture(url)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => return Err(ScreenshotError::Capture(format!("{:#}", e))),
        Err(_) => return Err(ScreenshotError::Timeout(timeout)),
    };

    tracing::info!(path = %path.display(), bytes = bytes.len(), "Saving screenshot to file");
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|e| ScreenshotError::Save(e.to_string()))
}

async fn screenshot(State(state): State<AppState>, body: Bytes) -> Response {
    tracing::info!("Received request on /screenshot");

    let (request, url) = match parse_request(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected screenshot request");
            return e.into_response();
        }
    };

    let timeout = request.timeout(state.config.default_timeout);

    let file_path = match prepare_screenshot_path(state.config.output_dir(), &url).await {
        Ok(path) => path,
        Err(e) => {
            tracing::error!(error = %e, "Failed to generate file name");
            return e.into_response();
        }
    };
    let file_path_str = file_path.display().to_string();

    tracing::info!(url = %url, timeout = ?timeout, "Capturing screenshot");

    match capture_to_file(state.engine.as_ref(), &url, &file_path, timeout).await {
        Ok(()) => {
            tracing::info!(path = %file_path_str, "Screenshot saved");
            (
                StatusCode::OK,
                Json(ScreenshotResponse::success(file_path_str)),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(url = %url, error = %e, "Error capturing screenshot");
            e.into_response_with_path(file_path_str)
        }
    }
}
