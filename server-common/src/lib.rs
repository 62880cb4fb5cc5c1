//! Shared HTTP bootstrap for the servers in this workspace.
//!
//! Binary servers build an axum `Router` and hand it to `run_http()`.

use anyhow::Context;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// CLI arguments shared across all servers.
#[derive(Debug, Clone, clap::Args)]
pub struct CliArgs {
    /// Host to bind to
    #[clap(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind to
    #[clap(long, default_value = "8080")]
    pub port: u16,
}

impl CliArgs {
    /// Parse `host:port` into a socket address.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}

/// Serve `router` over HTTP until Ctrl+C is received.
///
/// Every request is traced through `tower-http`'s `TraceLayer`. Logging must
/// already be initialised via [`init_logging`].
pub async fn run_http(router: Router, args: &CliArgs) -> anyhow::Result<()> {
    let addr = args.socket_addr()?;

    tracing::info!(host = %args.host, port = args.port, "Starting HTTP server");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Screenshot service listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router.layer(TraceLayer::new_for_http()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Ctrl+C received, shutting down");
}

/// Initialise the global tracing subscriber (`RUST_LOG`, default `info`).
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
