//! Service configuration.
//!
//! Values are layered, later sources winning: built-in defaults for the
//! service, an optional TOML file, then `DEX_*` environment variables
//! (`DEX_PORT`, `DEX_STORE_PATH`, `DEX_STORAGE_DIR`, `DEX_REGISTRY_URL`,
//! `DEX_UPSTREAM_URL`, `DEX_FETCH_TIMEOUT_SECS`, ...).

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use dex_pipeline::PipelineConfig;
use serde::Deserialize;

use crate::expand_tilde;

/// Per-service fallbacks applied before any file or environment source.
#[derive(Debug, Clone, Copy)]
pub struct Defaults {
  pub port:        u16,
  pub store_path:  &'static str,
  pub storage_dir: &'static str,
}

impl Defaults {
  pub const DEM: Self =
    Self { port: 8000, store_path: "data/dem.db", storage_dir: "data/dem" };
  pub const MDM: Self =
    Self { port: 8001, store_path: "data/mdm.db", storage_dir: "data/mdm" };
}

/// Runtime configuration of one service, built once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  pub host:               String,
  pub port:               u16,
  /// SQLite database file. A leading `~` is expanded.
  pub store_path:         PathBuf,
  /// Root of the `raw/` and `processed/` artifact directories.
  pub storage_dir:        PathBuf,
  /// Registry base URL that extracted records are pushed to (DEM).
  #[serde(default)]
  pub registry_url:       Option<String>,
  /// Exchange base URL that pull-mode sync reads from (MDM).
  #[serde(default)]
  pub upstream_url:       Option<String>,
  pub fetch_timeout_secs: u64,
}

impl ServiceConfig {
  /// Load from `path` (skipped if absent) and the environment.
  pub fn load(path: &Path, defaults: Defaults) -> anyhow::Result<Self> {
    let settings = ::config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", i64::from(defaults.port))?
      .set_default("store_path", defaults.store_path)?
      .set_default("storage_dir", defaults.storage_dir)?
      .set_default("fetch_timeout_secs", 10_i64)?
      .add_source(::config::File::from(path.to_path_buf()).required(false))
      .add_source(::config::Environment::with_prefix("DEX").try_parsing(true))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServiceConfig")
  }

  /// The explicit configuration handed to the orchestrators.
  pub fn pipeline(&self) -> PipelineConfig {
    PipelineConfig {
      storage_dir:        expand_tilde(&self.storage_dir),
      registry_url:       self.registry_url.clone(),
      upstream_url:       self.upstream_url.clone(),
      fetch_timeout_secs: self.fetch_timeout_secs,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ServiceConfig::load(&dir.path().join("absent.toml"), Defaults::MDM).unwrap();
    assert_eq!(cfg.port, 8001);
    assert_eq!(cfg.store_path, PathBuf::from("data/mdm.db"));
    assert_eq!(cfg.fetch_timeout_secs, 10);
  }

  #[test]
  fn file_values_override_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
      file,
      r#"
port = 9100
storage_dir = "/srv/dex"
registry_url = "http://mdm.internal:8001"
fetch_timeout_secs = 3
"#
    )
    .unwrap();

    let cfg = ServiceConfig::load(file.path(), Defaults::DEM).unwrap();
    assert_eq!(cfg.port, 9100);
    assert_eq!(cfg.host, "127.0.0.1");

    let pipeline = cfg.pipeline();
    assert_eq!(pipeline.storage_dir, PathBuf::from("/srv/dex"));
    assert_eq!(pipeline.registry_url().unwrap(), "http://mdm.internal:8001");
    assert!(pipeline.upstream_url().is_err());
    assert_eq!(pipeline.fetch_timeout_secs, 3);
  }
}
