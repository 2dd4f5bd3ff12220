//! inbox-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered under
//! `INBOX_*` environment variables, opens the SQLite store, and serves the
//! JSON API over HTTP.
//!
//! ```text
//! INBOX_PORT=9000 cargo run -p inbox-server -- --config /etc/inbox.toml
//! ```

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use inbox_core::inbox::Inbox;
use inbox_server::ServerConfig;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Per-user message inbox server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config).with_context(|| {
    format!("failed to load configuration from {:?}", cli.config)
  })?;

  let store = inbox_server::open_store(&server_cfg)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.database_path))?;
  if server_cfg.is_in_memory() {
    tracing::warn!("using an in-memory store; messages will not survive a restart");
  }

  let app = inbox_server::router(Arc::new(Inbox::new(Arc::new(store))));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("server stopped");
  Ok(())
}

/// Resolve on Ctrl-C. If the handler cannot be installed the server simply
/// runs until killed.
async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
}
