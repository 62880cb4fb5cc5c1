//! Service configuration: where screenshots go and how long a capture may take.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable selecting the screenshot directory.
pub const OUTPUT_PATH_ENV: &str = "OUTPUT_PATH";

/// Directory used when neither the CLI nor the environment names one.
pub const DEFAULT_OUTPUT_DIR: &str = "./screenshots";

/// Capture budget applied when a request omits `timeout` (or sends `0`).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Read-only settings shared by every request.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory screenshots are written to.
    pub output_dir: PathBuf,
    /// Budget for a capture when the request does not specify one.
    pub default_timeout: Duration,
}

impl ServiceConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create the output directory if it does not exist yet.
    pub fn ensure_output_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                self.output_dir.display()
            )
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

/// Resolve the screenshot directory.
///
/// Priority:
/// 1. explicit override (`--output-path`)
/// 2. `OUTPUT_PATH` env var (ignored when empty)
/// 3. `./screenshots`
pub fn resolve_output_dir(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir;
    }

    match std::env::var(OUTPUT_PATH_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(DEFAULT_OUTPUT_DIR),
    }
}
