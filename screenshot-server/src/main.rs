//! Screenshot service binary.
//!
//! `serve` (default): expose `POST /screenshot` over HTTP.

use clap::{Parser, Subcommand};
use screenshot_core::config::resolve_output_dir;
use screenshot_core::{BrowserManagerConfig, ServiceConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "screenshot-server", about = "Headless browser screenshot service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default when no subcommand given)
    Serve(ServeArgs),
}

#[derive(Parser)]
struct ServeArgs {
    #[clap(flatten)]
    server: server_common::CliArgs,

    /// Screenshot directory (overrides OUTPUT_PATH, default ./screenshots)
    #[clap(long)]
    output_path: Option<PathBuf>,

    /// Custom Chrome/Edge binary path
    #[clap(long)]
    browser_path: Option<String>,

    /// Connect to already-running browser via CDP URL
    #[clap(long)]
    cdp_url: Option<String>,

    /// Run browser in headless mode
    #[clap(long, default_value = "true", action = clap::ArgAction::Set)]
    headless: bool,
}

impl ServeArgs {
    fn browser_config(&self) -> BrowserManagerConfig {
        BrowserManagerConfig {
            browser_path: self.browser_path.clone(),
            cdp_url: self.cdp_url.clone(),
            headless: self.headless,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let args = match cli.command {
        Some(Command::Serve(args)) => args,
        None => ServeArgs::parse_from(["screenshot-server"]),
    };

    run_serve(args).await
}

async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    server_common::init_logging();

    let config = ServiceConfig::new(resolve_output_dir(args.output_path.clone()));
    config.ensure_output_dir()?;

    tracing::info!(
        output_dir = %config.output_dir().display(),
        cdp_url = ?args.cdp_url,
        headless = args.headless,
        "Screenshot service configured"
    );

    let router = screenshot_core::build_browser_router(config, args.browser_config());
    server_common::run_http(router, &args.server).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::parse_from(["screenshot-server"]);
        assert!(cli.command.is_none());

        let args = ServeArgs::parse_from(["screenshot-server"]);
        assert_eq!(args.server.port, 8080);
        assert!(args.headless);
        assert!(args.output_path.is_none());
    }

    #[test]
    fn test_serve_args() {
        let cli = Cli::parse_from([
            "screenshot-server",
            "serve",
            "--port",
            "9000",
            "--output-path",
            "/tmp/shots",
            "--cdp-url",
            "ws://127.0.0.1:9222/devtools/browser/abc",
            "--headless",
            "false",
        ]);

        let Some(Command::Serve(args)) = cli.command else {
            panic!("expected serve subcommand");
        };
        assert_eq!(args.server.port, 9000);
        assert_eq!(args.output_path, Some(PathBuf::from("/tmp/shots")));

        let browser = args.browser_config();
        assert!(!browser.headless);
        assert_eq!(
            browser.cdp_url.as_deref(),
            Some("ws://127.0.0.1:9222/devtools/browser/abc")
        );
        assert_eq!(browser.ready_selector, "body");
    }
}
