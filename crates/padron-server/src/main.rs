//! padron server binary.
//!
//! Reads `padron.toml` (or the path given with `--config`) plus `PADRON_*`
//! environment variables, opens the primary and secondary stores, and
//! serves the JSON API over HTTP.

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use padron_api::{AppState, PrimaryStore, RagClient};
use padron_core::{memory::MemoryStore, store::LogStore};
use padron_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Padron personal-data registry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "padron.toml")]
  config: PathBuf,
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
  let cfg = ServerConfig::load(&cli.config)?;

  let rag = RagClient::new(&cfg.rag_url, cfg.rag_timeout(), cfg.rag_health_timeout())
    .context("failed to build RAG client")?;
  tracing::info!(url = %cfg.rag_url, "RAG service configured");

  let secondary = open_log_store(&cfg).await;

  match &cfg.store_path {
    Some(path) => {
      let store = SqliteStore::open(path)
        .await
        .with_context(|| format!("failed to open store at {path:?}"))?;
      tracing::info!(path = %path.display(), "primary store: sqlite");
      serve(&cfg, AppState::new(Arc::new(store), secondary, rag, "sqlite")).await
    }
    None => {
      tracing::warn!("no store_path configured; personas are kept in memory only");
      let store = MemoryStore::new();
      serve(&cfg, AppState::new(Arc::new(store), secondary, rag, "memory")).await
    }
  }
}

/// Connect to the secondary log store with the configured retry loop. A
/// store that never answers leaves the journal on the primary alone until
/// restart.
async fn open_log_store(cfg: &ServerConfig) -> Option<Arc<SqliteStore>> {
  let Some(path) = &cfg.log_store_path else {
    tracing::info!("no log_store_path configured; journal uses the primary store only");
    return None;
  };

  match SqliteStore::connect_with_retry(
    path,
    cfg.log_store_retry_attempts,
    cfg.log_store_retry_delay(),
  )
  .await
  {
    Ok(store) => Some(Arc::new(store)),
    Err(e) => {
      tracing::warn!(
        path = %path.display(),
        error = %e,
        "log store unavailable after all attempts; continuing without it"
      );
      None
    }
  }
}

async fn serve<S, L>(cfg: &ServerConfig, state: AppState<S, L>) -> anyhow::Result<()>
where
  S: PrimaryStore,
  L: LogStore + 'static,
{
  let app = padron_api::app(state.with_log_limits(cfg.log_row_limit, cfg.log_query_cap));
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
