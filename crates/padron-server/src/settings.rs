//! Runtime configuration: an optional TOML file overlaid with `PADRON_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use serde::Deserialize;

/// Environment variable prefix, e.g. `PADRON_PORT=8080`.
pub const ENV_PREFIX: &str = "PADRON";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                     String,
  pub port:                     u16,
  /// Primary SQLite file. Unset selects the in-memory store.
  pub store_path:               Option<PathBuf>,
  /// Secondary log store SQLite file. Unset disables the secondary.
  pub log_store_path:           Option<PathBuf>,
  pub log_store_retry_attempts: u32,
  pub log_store_retry_delay_ms: u64,
  pub rag_url:                  String,
  pub rag_timeout_ms:           u64,
  pub rag_health_timeout_ms:    u64,
  pub log_row_limit:            usize,
  pub log_query_cap:            usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                     "0.0.0.0".to_owned(),
      port:                     5000,
      store_path:               None,
      log_store_path:           None,
      log_store_retry_attempts: 3,
      log_store_retry_delay_ms: 5000,
      rag_url:                  "http://llm_service:8000".to_owned(),
      rag_timeout_ms:           15_000,
      rag_health_timeout_ms:    3_000,
      log_row_limit:            padron_core::journal::DEFAULT_ROW_LIMIT,
      log_query_cap:            padron_core::journal::DEFAULT_QUERY_CAP,
    }
  }
}

impl ServerConfig {
  /// Read `path` if it exists, then apply environment overrides.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
      .build()
      .context("failed to read config file")?;

    let mut cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;

    cfg.store_path = cfg.store_path.as_deref().map(expand_tilde);
    cfg.log_store_path = cfg.log_store_path.as_deref().map(expand_tilde);
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn log_store_retry_delay(&self) -> Duration {
    Duration::from_millis(self.log_store_retry_delay_ms)
  }

  pub fn rag_timeout(&self) -> Duration { Duration::from_millis(self.rag_timeout_ms) }

  pub fn rag_health_timeout(&self) -> Duration {
    Duration::from_millis(self.rag_health_timeout_ms)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
