//! loadcal server binary.
//!
//! Reads `loadcal.toml` (or the path given with `--config`) overlaid by
//! `LOADCAL_*` environment variables, opens the SQLite store and serves the
//! JSON API. On SIGINT/SIGTERM it stops accepting requests, then gives
//! pending overload alerts `shutdown_grace_secs` to finish.
//!
//! ```
//! cargo run -p loadcal-server -- --config loadcal.toml --seed
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use loadcal_alert::OverloadDispatcher;
use loadcal_api::ApiState;
use loadcal_core::calendar::today_utc;
use loadcal_server::{ServerConfig, seed};
use loadcal_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Load calendar and capacity heatmap server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "loadcal.toml")]
  config: PathBuf,

  /// Populate sample data if the store is empty, then serve.
  #[arg(long)]
  seed: bool,
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

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load config from {:?}", cli.config))?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  if cli.seed {
    seed::seed_if_empty(&*store, today_utc())
      .await
      .context("failed to seed sample data")?;
  }

  let dispatcher = Arc::new(
    OverloadDispatcher::spawn(store.clone(), server_cfg.alert_config())
      .context("failed to start alert dispatcher")?,
  );

  let state = ApiState::new(store)
    .with_alerts(dispatcher.clone())
    .with_policy(server_cfg.policy())
    .with_api_key(server_cfg.api_key.as_deref());
  if server_cfg.api_key.is_none() {
    tracing::warn!("no api_key configured; mutating endpoints are open");
  }

  let app = loadcal_server::app(state);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("draining overload alerts");
  dispatcher.shutdown(server_cfg.shutdown_grace()).await;
  Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::warn!(error = %e, "failed to listen for ctrl-c");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
      Ok(mut sigterm) => {
        sigterm.recv().await;
      }
      Err(e) => {
        tracing::warn!(error = %e, "failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {}
    _ = terminate => {}
  }
  tracing::info!("shutdown signal received");
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
