//! Error type for `dex-pipeline`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A setting required by the requested operation is missing or invalid.
  #[error("configuration error: {0}")]
  Config(String),

  #[error("invalid request: {0}")]
  Invalid(String),

  #[error("fetching {url} failed: {message}")]
  Fetch { url: String, message: String },

  #[error("invalid payload: {0}")]
  Payload(String),

  #[error("artifact error at {}: {source}", .path.display())]
  Artifact {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("provider {0:?} is already registered")]
  ProviderExists(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
