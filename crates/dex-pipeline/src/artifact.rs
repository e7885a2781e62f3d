//! Raw and processed snapshots on disk.
//!
//! Every run writes the exact bytes it fetched to
//! `raw/{stem}_raw.json` and its clean batch to
//! `processed/{stem}_processed.json`, where `stem` is the sanitized source
//! name followed by a UTC timestamp. Paths returned here are what provenance
//! entries record.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dex_core::country::CanonicalCountry;

use crate::{Error, PipelineConfig, Result};

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_name(name: &str) -> String {
  let cleaned: String = name
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
    .collect();
  if cleaned.is_empty() { "_".to_owned() } else { cleaned }
}

/// The shared file stem for one run's artifacts.
pub fn stem(name: &str, at: DateTime<Utc>) -> String {
  format!("{}_{}", sanitize_name(name), at.format("%Y%m%d%H%M%S"))
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
  raw_dir:       PathBuf,
  processed_dir: PathBuf,
}

impl ArtifactStore {
  pub fn new(raw_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
    Self { raw_dir: raw_dir.into(), processed_dir: processed_dir.into() }
  }

  pub fn from_config(config: &PipelineConfig) -> Self {
    Self::new(config.raw_dir(), config.processed_dir())
  }

  pub fn raw_path(&self, stem: &str) -> PathBuf {
    self.raw_dir.join(format!("{stem}_raw.json"))
  }

  pub fn processed_path(&self, stem: &str) -> PathBuf {
    self.processed_dir.join(format!("{stem}_processed.json"))
  }

  /// Persist the fetched payload byte for byte.
  pub async fn write_raw(&self, stem: &str, body: &[u8]) -> Result<PathBuf> {
    let path = self.raw_path(stem);
    write(&path, body).await?;
    Ok(path)
  }

  /// Persist the clean batch as pretty-printed JSON. Non-ASCII text is kept
  /// as UTF-8, never escaped.
  pub async fn write_processed(
    &self,
    stem: &str,
    clean: &[CanonicalCountry],
  ) -> Result<PathBuf> {
    let path = self.processed_path(stem);
    let body = serde_json::to_vec_pretty(clean)?;
    write(&path, &body).await?;
    Ok(path)
  }

  /// Read back a processed artifact previously written by this store or a
  /// sibling one.
  pub async fn read_processed(path: &Path) -> Result<Vec<CanonicalCountry>> {
    let body = tokio::fs::read(path)
      .await
      .map_err(|source| Error::Artifact { path: path.to_owned(), source })?;
    Ok(serde_json::from_slice(&body)?)
  }
}

async fn write(path: &Path, body: &[u8]) -> Result<()> {
  let artifact = |source| Error::Artifact { path: path.to_owned(), source };
  if let Some(dir) = path.parent() {
    tokio::fs::create_dir_all(dir).await.map_err(artifact)?;
  }
  tokio::fs::write(path, body).await.map_err(artifact)
}
