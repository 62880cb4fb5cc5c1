//! BrowserManager: CDP-driven page rendering.
//!
//! Every capture gets its own browser session: either a freshly launched
//! headless Chrome with a throwaway `--user-data-dir`, or a new tab in an
//! already-running browser reached through `cdp_url`. Nothing is shared
//! between requests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use url::Url;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);
const TAB_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Renders a page and returns the encoded image.
///
/// The HTTP layer only talks to this trait, so it can be exercised without a
/// real browser.
#[async_trait]
pub trait ScreenshotEngine: Send + Sync {
    /// Navigate to `url` and return a full-page PNG.
    ///
    /// Callers bound this with a timeout; dropping the future must release
    /// every browser resource it acquired.
    async fn capture(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Configuration for the BrowserManager.
#[derive(Debug, Clone)]
pub struct BrowserManagerConfig {
    /// Custom Chrome/Edge binary path.
    pub browser_path: Option<String>,
    /// Connect to an already-running browser via CDP URL.
    pub cdp_url: Option<String>,
    /// Run headless (default: true).
    pub headless: bool,
    /// Browser window size.
    pub window_size: (u32, u32),
    /// Accept self-signed and otherwise invalid TLS certificates.
    pub ignore_certificate_errors: bool,
    /// Launch with `--disable-web-security`.
    pub disable_web_security: bool,
    /// CSS selector that must be visible before the page is captured.
    pub ready_selector: String,
}

impl Default for BrowserManagerConfig {
    fn default() -> Self {
        Self {
            browser_path: None,
            cdp_url: None,
            headless: true,
            window_size: (1280, 720),
            ignore_certificate_errors: true,
            disable_web_security: true,
            ready_selector: "body".to_string(),
        }
    }
}

/// Launches (or connects to) a browser per capture.
pub struct BrowserManager {
    config: BrowserManagerConfig,
}

/// CDP event loop task, aborted when the last owner lets go of it.
struct HandlerTask(JoinHandle<()>);

impl Drop for HandlerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn spawn_handler(mut handler: chromiumoxide::Handler) -> Arc<HandlerTask> {
    Arc::new(HandlerTask(tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })))
}

/// A browser tab that can be closed.
#[async_trait]
trait Tab: Send + Sized + 'static {
    async fn close_tab(self) -> Result<()>;
}

#[async_trait]
impl Tab for Page {
    async fn close_tab(self) -> Result<()> {
        self.close().await.context("Failed to close page")
    }
}

/// Open tab owned by a capture.
///
/// If the capture is cancelled before [`TabGuard::close`], the tab is closed
/// from a background task. The guard holds the CDP event loop alive until
/// that close has gone through, since a remote browser keeps running after
/// we disconnect.
struct TabGuard<T: Tab> {
    tab: Option<T>,
    keep_alive: Option<Arc<HandlerTask>>,
}

impl<T: Tab> TabGuard<T> {
    fn new(tab: T, keep_alive: Arc<HandlerTask>) -> Self {
        Self {
            tab: Some(tab),
            keep_alive: Some(keep_alive),
        }
    }

    async fn close(mut self) -> Result<()> {
        match self.tab.take() {
            Some(tab) => tab.close_tab().await,
            None => Ok(()),
        }
    }
}

impl<T: Tab> Drop for TabGuard<T> {
    fn drop(&mut self) {
        let Some(tab) = self.tab.take() else {
            return;
        };
        let keep_alive = self.keep_alive.take();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No runtime left to close abandoned tab");
            return;
        };

        runtime.spawn(async move {
            match tokio::time::timeout(TAB_CLOSE_TIMEOUT, tab.close_tab()).await {
                Ok(Ok(())) => tracing::debug!("Closed tab of cancelled capture"),
                Ok(Err(e)) => tracing::debug!(error = ?e, "Failed to close abandoned tab"),
                Err(_) => tracing::warn!("Timed out closing abandoned tab"),
            }
            drop(keep_alive);
        });
    }
}

fn remove_profile_dir(dir: TempDir) {
    let path = dir.path().to_path_buf();
    if let Err(e) = dir.close() {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove browser profile directory");
    }
}

/// A browser connection owned by a single capture.
///
/// Dropping it without [`BrowserSession::close`] still tears everything down:
/// a launched Chrome is killed and reaped in the background before its
/// profile directory is removed, and the event handler task is aborted once
/// no open tab needs it.
struct BrowserSession {
    browser: Option<Browser>,
    handler: Arc<HandlerTask>,
    launched: bool,
    user_data_dir: Option<TempDir>,
}

impl BrowserSession {
    fn browser(&self) -> Result<&Browser> {
        self.browser
            .as_ref()
            .context("Browser session already closed")
    }

    async fn close(mut self) {
        if let Some(mut browser) = self.browser.take() {
            if self.launched {
                if let Err(e) = browser.close().await {
                    tracing::warn!(error = %e, "Failed to close browser");
                }
                if let Err(e) = browser.wait().await {
                    tracing::warn!(error = %e, "Failed to reap browser process");
                }
            }
        }

        if let Some(dir) = self.user_data_dir.take() {
            if let Err(e) = tokio::task::spawn_blocking(move || remove_profile_dir(dir)).await {
                tracing::warn!(error = %e, "Profile cleanup task failed");
            }
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let (Some(mut browser), Some(dir)) = (self.browser.take(), self.user_data_dir.take())
        else {
            return;
        };

        // Chrome keeps writing to its profile until the process is gone
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Some(Err(e)) = browser.kill().await {
                        tracing::warn!(error = %e, "Failed to kill browser of cancelled capture");
                    }
                    drop(browser);
                    if let Err(e) =
                        tokio::task::spawn_blocking(move || remove_profile_dir(dir)).await
                    {
                        tracing::warn!(error = %e, "Profile cleanup task failed");
                    }
                });
            }
            Err(_) => {
                drop(browser);
                remove_profile_dir(dir);
            }
        }
    }
}

/// JavaScript expression that is `true` once `selector` matches a rendered,
/// visible element.
fn visibility_check(selector: &str) -> String {
    // A JSON string literal is a valid JavaScript string literal
    let selector = serde_json::Value::String(selector.to_string());
    format!(
        "(() => {{ \
            const el = document.querySelector({selector}); \
            if (!el) return false; \
            const style = window.getComputedStyle(el); \
            return el.getClientRects().length > 0 \
                && style.visibility !== 'hidden' \
                && style.display !== 'none'; \
        }})()"
    )
}

impl BrowserManager {
    pub fn new(config: BrowserManagerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserManagerConfig {
        &self.config
    }

    /// Chrome command-line flags on top of chromiumoxide's defaults.
    pub fn launch_args(&self) -> Vec<&'static str> {
        let mut args = vec!["--disable-dev-shm-usage", "--remote-allow-origins=*"];
        if self.config.ignore_certificate_errors {
            args.push("--ignore-certificate-errors");
        }
        if self.config.disable_web_security {
            args.push("--disable-web-security");
        }
        args
    }

    fn launch_config(&self, user_data_dir: &TempDir) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder();

        if let Some(ref path) = self.config.browser_path {
            builder = builder.chrome_executable(path);
        }

        if !self.config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .window_size(self.config.window_size.0, self.config.window_size.1)
            .user_data_dir(user_data_dir.path());

        for arg in self.launch_args() {
            builder = builder.arg(arg);
        }

        builder.build().map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn open_session(&self) -> Result<BrowserSession> {
        if let Some(ref cdp_url) = self.config.cdp_url {
            let (browser, handler) = Browser::connect(cdp_url)
                .await
                .with_context(|| format!("Failed to connect to browser at {}", cdp_url))?;

            return Ok(BrowserSession {
                browser: Some(browser),
                handler: spawn_handler(handler),
                launched: false,
                user_data_dir: None,
            });
        }

        // Concurrent Chrome instances must not share a profile directory
        let user_data_dir = tempfile::Builder::new()
            .prefix("screenshot-chrome-")
            .tempdir()
            .context("Failed to create browser profile directory")?;

        let config = self.launch_config(&user_data_dir)?;

        let (browser, handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        Ok(BrowserSession {
            browser: Some(browser),
            handler: spawn_handler(handler),
            launched: true,
            user_data_dir: Some(user_data_dir),
        })
    }

    /// Poll until the ready selector is visible. Bounded only by the caller's timeout.
    async fn wait_until_ready(&self, page: &Page) -> Result<()> {
        let selector = &self.config.ready_selector;
        let check = visibility_check(selector);
        loop {
            match page.evaluate(check.as_str()).await {
                Ok(result) => match result.into_value::<bool>() {
                    Ok(true) => return Ok(()),
                    Ok(false) => {
                        tracing::trace!(selector = %selector, "Ready selector not visible yet");
                    }
                    Err(e) => {
                        tracing::trace!(selector = %selector, error = %e, "Unexpected readiness result");
                    }
                },
                Err(e) => {
                    tracing::trace!(selector = %selector, error = %e, "Page not ready yet");
                }
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn render_page(&self, page: &Page, url: &Url) -> Result<Vec<u8>> {
        tracing::info!(url = %url, "Navigating to URL");
        page.goto(url.as_str())
            .await
            .with_context(|| format!("Navigation to {} failed", url))?;

        self.wait_until_ready(page).await?;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        page.screenshot(params).await.context("Screenshot failed")
    }

    async fn render(&self, session: &BrowserSession, url: &Url) -> Result<Vec<u8>> {
        let page = session
            .browser()?
            .new_page("about:blank")
            .await
            .context("Failed to create new page")?;
        let tab = TabGuard::new(page.clone(), session.handler.clone());

        let result = self.render_page(&page, url).await;

        if let Err(e) = tab.close().await {
            tracing::debug!(error = ?e, "Failed to close page");
        }

        result
    }
}

#[async_trait]
impl ScreenshotEngine for BrowserManager {
    async fn capture(&self, url: &Url) -> Result<Vec<u8>> {
        let session = self.open_session().await?;
        let result = self.render(&session, url).await;
        session.close().await;
        result
    }
}
