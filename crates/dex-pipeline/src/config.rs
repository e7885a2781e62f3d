//! Explicit pipeline configuration, built once at process start.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::{Error, Result};

fn default_fetch_timeout_secs() -> u64 { 10 }

/// Settings shared by every orchestrator.
///
/// `registry_url` and `upstream_url` are optional at startup; the operations
/// that need them fail with [`Error::Config`] before doing any I/O.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
  /// Holds the `raw/` and `processed/` artifact directories.
  pub storage_dir:        PathBuf,
  /// Base URL of the registry service that extracted records are pushed to.
  #[serde(default)]
  pub registry_url:       Option<String>,
  /// Base URL of the sibling service pulled from in pull-and-reconcile mode.
  #[serde(default)]
  pub upstream_url:       Option<String>,
  #[serde(default = "default_fetch_timeout_secs")]
  pub fetch_timeout_secs: u64,
}

impl PipelineConfig {
  pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
    Self {
      storage_dir:        storage_dir.into(),
      registry_url:       None,
      upstream_url:       None,
      fetch_timeout_secs: default_fetch_timeout_secs(),
    }
  }

  pub fn fetch_timeout(&self) -> Duration { Duration::from_secs(self.fetch_timeout_secs) }

  pub fn raw_dir(&self) -> PathBuf { self.storage_dir.join("raw") }

  pub fn processed_dir(&self) -> PathBuf { self.storage_dir.join("processed") }

  /// The push target, or a configuration error naming the missing setting.
  pub fn registry_url(&self) -> Result<&str> {
    required(self.registry_url.as_deref(), "registry_url", "DEX_REGISTRY_URL")
  }

  /// The pull source, or a configuration error naming the missing setting.
  pub fn upstream_url(&self) -> Result<&str> {
    required(self.upstream_url.as_deref(), "upstream_url", "DEX_UPSTREAM_URL")
  }
}

fn required<'a>(value: Option<&'a str>, key: &str, env: &str) -> Result<&'a str> {
  match value.map(str::trim) {
    Some(v) if !v.is_empty() => Ok(v),
    _ => Err(Error::Config(format!(
      "{key} is not configured (set {env} or `{key}` in the config file)"
    ))),
  }
}
