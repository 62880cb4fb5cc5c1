//! Screenshot service core library.
//!
//! Provides `build_router()` which wires a [`ServiceConfig`] and a
//! [`ScreenshotEngine`] into an axum `Router` serving `POST /screenshot`.

pub mod browser;
pub mod config;
pub mod error;
pub mod handler;
pub mod naming;
pub mod request;

pub use browser::{BrowserManager, BrowserManagerConfig, ScreenshotEngine};
pub use config::ServiceConfig;
pub use error::ScreenshotError;
pub use request::{ScreenshotRequest, ScreenshotResponse};

use axum::Router;
use handler::AppState;
use std::sync::Arc;

/// Build the HTTP router for the screenshot service.
pub fn build_router(config: ServiceConfig, engine: Arc<dyn ScreenshotEngine>) -> Router {
    handler::router(AppState::new(config, engine))
}

/// Build the router backed by a real Chrome session per request.
pub fn build_browser_router(config: ServiceConfig, browser: BrowserManagerConfig) -> Router {
    build_router(config, Arc::new(BrowserManager::new(browser)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_router() {
        let _router = build_browser_router(
            ServiceConfig::default(),
            BrowserManagerConfig::default(),
        );
    }
}
